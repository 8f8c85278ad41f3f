pub mod dispatcher;
pub mod jina_bert_v2;
pub mod local;
pub mod model;
pub mod pool;
pub mod remote;
pub mod service;
pub mod traits;

pub use local::LocalEmbeddingProvider;
pub use model::EmbeddingModel;
pub use pool::EmbeddingModelPool;
pub use remote::RemoteEmbeddingProvider;
pub use service::{build_provider, DefaultEmbeddingService};
pub use traits::{EmbeddingProvider, EmbeddingService, EmbeddingStats};
