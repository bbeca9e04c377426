pub mod ddl;
pub mod migrate;
pub mod tables;
