//! Utility helpers: serialization helpers (JSON/YAML/file serializers).
pub mod serialization;

pub use serialization::atomic_write;
pub use serialization::FileSerializer;
pub use serialization::FileUtils;
pub use serialization::JsonSerializer;
pub use serialization::Serializer;
pub use serialization::YamlSerializer;
