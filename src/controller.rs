pub mod service;

pub use service::CaptureService;
