use chrono::{DateTime, Utc};
use image::RgbImage;
use uuid::Uuid;

/// One decoded screen capture. Owned by the call that captured it.
pub struct Frame {
    image: RgbImage,
    captured_at: DateTime<Utc>,
    frame_id: Uuid,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: DateTime<Utc>, frame_id: Uuid) -> Self {
        Self {
            image,
            captured_at,
            frame_id,
        }
    }

    pub fn captured_now(image: RgbImage) -> Self {
        Self::new(image, Utc::now(), Uuid::new_v4())
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get_frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn get_captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
