pub mod chunker;
pub mod ingest;
pub mod retrieval;
pub mod vector_index;
