//! Live facial expression recognition: detection, temporal smoothing and
//! overlay rendering over camera or video frames.

pub mod shared {
    pub mod constants;
    pub mod expression;
    pub mod frame;
    pub mod model_resolver;
    pub mod region;
    pub mod settings;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod expression_smoother;
        pub mod face_detector;
        pub mod face_selector;
    }
    pub mod infrastructure;
}

pub mod overlay {
    pub mod domain {
        pub mod overlay_renderer;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod video_reader;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod detection_executor;
    pub mod fps_counter;
    pub mod infrastructure;
    pub mod interval_gate;
    pub mod live_expression_use_case;
    pub mod session_logger;
    pub mod session_status;
}
