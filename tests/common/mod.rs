#![allow(dead_code)]

pub mod detector;
pub mod synthetic_frame;
