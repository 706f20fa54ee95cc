pub mod config;
pub mod downloader;
pub mod fetch_error;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod station_list;
pub mod task_file;
