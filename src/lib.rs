pub mod context;
pub mod core;
pub mod history;
pub mod intent;
pub mod livedata;
pub mod llm;
pub mod server;
pub mod state;
pub mod stream;
pub mod util;
