/// Chapter objective parameters.

#[derive(Debug, Clone, Copy)]
pub struct ChapterTuning {
    pub flag_position: (f32, f32),
    /// Player-center to flag distance that captures it.
    pub capture_distance: f32,
    pub flag_points: u32,
}

impl Default for ChapterTuning {
    fn default() -> Self {
        Self {
            flag_position: (700.0, 50.0),
            capture_distance: 30.0,
            flag_points: 500,
        }
    }
}
