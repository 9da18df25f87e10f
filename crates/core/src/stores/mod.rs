pub mod local;
pub mod memory;
pub mod pinecone;

pub use local::LocalLibrary;
pub use memory::MemoryVectorIndex;
pub use pinecone::PineconeIndex;
