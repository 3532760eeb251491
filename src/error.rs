use std::path::PathBuf;

use thiserror::Error;

use crate::common::Region;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No device detected, make sure the emulator is running and connected: {0}")]
    Connection(String),
    #[error("Configuration Error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("Capture Error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Template Error: {0}")]
    Template(#[from] TemplateError),
    #[error("Match Error: {0}")]
    Match(#[from] MatchError),
    #[error("Workflow Error: {0}")]
    Workflow(String),
    #[error("Setup Error: {0}")]
    Setup(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Device channel error type
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Screencap failed: {0}")]
    Device(#[from] DeviceError),
    #[error("Screencap returned no bytes")]
    Empty,
    #[error("Failed to decode screencap: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template file does not exist: {0}")]
    MissingAsset(PathBuf),
    #[error("Failed to decode template {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
    #[error("Region {region} exceeds frame of {width}x{height}")]
    RegionOutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },
    #[error("Search area is empty")]
    EmptyArea,
    #[error("Template of {template_width}x{template_height} does not fit a {area_width}x{area_height} search area")]
    TemplateTooLarge {
        template_width: u32,
        template_height: u32,
        area_width: u32,
        area_height: u32,
    },
}
