pub mod kv;
pub mod store;

pub use kv::{FileStore, MemoryStore};
pub use store::{
    decode_bindings, encode_bindings, find_binding, ActionName, BindingStore, GestureBinding,
    StoreError,
};
