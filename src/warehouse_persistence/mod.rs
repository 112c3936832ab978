mod table_schema;

pub use table_schema::*;
