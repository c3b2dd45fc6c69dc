mod chat_store;

pub use chat_store::InMemoryChatStore;
