pub mod blob_repository;
