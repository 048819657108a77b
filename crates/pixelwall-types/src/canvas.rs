use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single cell edit. `color` is an opaque CSS color string; the sentinel
/// value `"erase"` removes the cell instead of painting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
    pub color: String,
}

/// Frames sent FROM client TO server on the canvas channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasClientFrame {
    /// Apply a batch of cell edits
    Draw { pixels: Vec<Pixel> },

    /// Wipe the whole canvas
    Clear,
}

/// Frames sent FROM server TO clients on the canvas channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasServerFrame {
    /// Full snapshot sent once per connection, before any live frames.
    /// Keys are `"x,y"` coordinate strings.
    CanvasInit { data: HashMap<String, String> },

    /// A batch of edits some client drew
    Draw { pixels: Vec<Pixel> },

    /// The canvas was wiped
    Clear,
}
