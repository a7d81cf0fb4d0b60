pub mod codec;
mod store;
mod writer;

pub use codec::StoreMeta;
pub use store::Store;
pub use writer::StoreWriter;
