pub mod db;
pub mod indexes;
pub mod memory;
pub mod types;
pub mod vector_index;
