pub mod consumer_core;
