pub mod mock;
pub mod postgres;
pub mod traits;

pub use mock::InMemoryVectorStore;
pub use postgres::{PgVectorStore, SIMILARITY_FLOOR};
pub use traits::{VectorStore, DEFAULT_TOP_K};
