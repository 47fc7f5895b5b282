//! Scrollable dialogue box state: `Hidden -> Visible(offset) -> Hidden`.

use serde::{Deserialize, Serialize};

use super::types::{ConversationId, DEFAULT_SCROLL_SENSITIVITY};

/// Text area height of the reference dialogue box (150px box minus 2 × 20px padding).
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 110.0;
pub const DEFAULT_LINE_HEIGHT: f64 = 22.0;
/// Narrow columns per wrapped line; a CJK glyph takes two.
pub const DEFAULT_WRAP_COLUMNS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextLayout {
    pub line_height: f64,
    pub wrap_columns: usize,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            line_height: DEFAULT_LINE_HEIGHT,
            wrap_columns: DEFAULT_WRAP_COLUMNS,
        }
    }
}

impl TextLayout {
    pub fn line_count(&self, text: &str) -> usize {
        let wrap = self.wrap_columns.max(1);
        text.split('\n')
            .map(|paragraph| {
                let mut lines = 1;
                let mut columns = 0;
                for ch in paragraph.chars() {
                    let width = char_columns(ch);
                    if columns > 0 && columns + width > wrap {
                        lines += 1;
                        columns = 0;
                    }
                    columns += width;
                }
                lines
            })
            .sum()
    }

    pub fn content_height(&self, text: &str) -> f64 {
        self.line_count(text) as f64 * self.line_height
    }
}

fn char_columns(ch: char) -> usize {
    let code = ch as u32;
    let wide = matches!(
        code,
        0x1100..=0x115F
            | 0x2E80..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1F64F
            | 0x20000..=0x3FFFD
    );
    if wide {
        2
    } else {
        1
    }
}

/// Resume signal emitted when a visible dialogue is dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueDismissed {
    pub conversation: ConversationId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueViewport {
    visible: bool,
    conversation: Option<ConversationId>,
    text: String,
    /// Pixels scrolled down from the top of the content.
    scroll_offset: f64,
    viewport_height: f64,
    content_height: f64,
    sensitivity: f64,
    layout: TextLayout,
}

impl Default for DialogueViewport {
    fn default() -> Self {
        Self::new(
            DEFAULT_VIEWPORT_HEIGHT,
            DEFAULT_SCROLL_SENSITIVITY,
            TextLayout::default(),
        )
    }
}

impl DialogueViewport {
    pub fn new(viewport_height: f64, sensitivity: f64, layout: TextLayout) -> Self {
        Self {
            visible: false,
            conversation: None,
            text: String::new(),
            scroll_offset: 0.0,
            viewport_height: viewport_height.max(0.0),
            content_height: 0.0,
            sensitivity,
            layout,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn conversation(&self) -> Option<ConversationId> {
        self.conversation
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    pub fn max_scroll(&self) -> f64 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    /// Replaces the content and scrolls back to the top.
    pub fn show(&mut self, conversation: ConversationId, text: impl Into<String>) {
        self.text = text.into();
        self.content_height = self.layout.content_height(&self.text);
        self.scroll_offset = 0.0;
        self.conversation = Some(conversation);
        self.visible = true;
    }

    /// Moves the content by `delta × sensitivity`, clamped to the scrollable range.
    pub fn scroll(&mut self, delta: f64) {
        if !self.visible || self.content_height <= self.viewport_height || !delta.is_finite() {
            return;
        }
        let next = self.scroll_offset + delta * self.sensitivity;
        self.scroll_offset = next.clamp(0.0, self.max_scroll());
    }

    /// Hides the dialogue; a hidden viewport emits nothing.
    pub fn dismiss(&mut self) -> Option<DialogueDismissed> {
        if !self.visible {
            return None;
        }
        self.visible = false;
        self.scroll_offset = 0.0;
        self.conversation
            .take()
            .map(|conversation| DialogueDismissed { conversation })
    }
}
