pub mod threaded_detection_executor;
