/// Status API boundary: the fetcher capability and its HTTP implementation
pub mod client;
pub mod dto;
pub mod fetcher;

pub use client::GenSceneClient;
pub use fetcher::{poll_until_terminal, StatusFetcher};
