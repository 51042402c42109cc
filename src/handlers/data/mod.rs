pub mod collection;
pub mod record;

pub use collection::count as collection_count;
pub use collection::create as collection_create;
pub use collection::find as collection_find;

pub use record::delete as record_delete;
pub use record::get as record_get;
pub use record::patch as record_patch;
