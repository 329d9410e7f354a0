mod client;
mod links;
mod types;

pub use client::AzureDevOpsClient;
