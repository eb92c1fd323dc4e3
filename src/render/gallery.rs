use crate::record::{normalized_photos, str_field, Record};
use crate::render::{escape_html, GALLERY_IMAGE_PLACEHOLDER};

/// Items shown per gallery page.
pub const PAGE_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Pagination state over the sorted gallery list: a current offset plus a
/// fixed page size. Navigation re-renders only the visible slice.
#[derive(Debug)]
pub struct GalleryPager {
    offset: usize,
    page_size: usize,
    total: usize,
    last_direction: Direction,
}

impl GalleryPager {
    pub fn new(total: usize) -> Self {
        Self::with_page_size(total, PAGE_SIZE)
    }

    pub fn with_page_size(total: usize, page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size: page_size.max(1),
            total,
            last_direction: Direction::Forward,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn visible_range(&self) -> std::ops::Range<usize> {
        self.offset..(self.offset + self.page_size).min(self.total)
    }

    pub fn has_next(&self) -> bool {
        self.offset + self.page_size < self.total
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    /// Navigation is hidden entirely when everything fits on one page.
    pub fn controls_visible(&self) -> bool {
        self.total > self.page_size
    }

    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.offset += self.page_size;
        self.last_direction = Direction::Forward;
        true
    }

    pub fn prev(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.offset = self.offset.saturating_sub(self.page_size);
        self.last_direction = Direction::Back;
        true
    }

    /// Direction of the last navigation, for the slide transition class.
    pub fn direction(&self) -> Direction {
        self.last_direction
    }
}

/// Detail view cycling through one item's normalized photo list.
#[derive(Debug)]
pub struct PhotoViewer {
    photos: Vec<String>,
    index: usize,
}

impl PhotoViewer {
    pub fn open(item: &Record) -> Self {
        Self {
            photos: normalized_photos(item),
            index: 0,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.photos.get(self.index).map(String::as_str)
    }

    /// Prev/next affordances are disabled when only one photo exists.
    pub fn nav_enabled(&self) -> bool {
        self.photos.len() > 1
    }

    pub fn next(&mut self) {
        if self.nav_enabled() {
            self.index = (self.index + 1) % self.photos.len();
        }
    }

    pub fn prev(&mut self) {
        if self.nav_enabled() {
            self.index = (self.index + self.photos.len() - 1) % self.photos.len();
        }
    }

    /// Counter label, 1-based: "Fotografia i de n".
    pub fn counter(&self) -> String {
        let total = self.photos.len().max(1);
        format!("Fotografia {} de {}", self.index + 1, total)
    }
}

pub fn gallery_item(record: &Record) -> String {
    let id = escape_html(str_field(record, "id").unwrap_or(""));
    let title = escape_html(str_field(record, "title").unwrap_or(""));
    let description = escape_html(str_field(record, "description").unwrap_or(""));
    let image = escape_html(str_field(record, "image").unwrap_or(GALLERY_IMAGE_PLACEHOLDER));

    format!(
        r#"<div class="col-6 col-lg-3">
  <article class="gallery-item" data-gallery-id="{id}">
    <div class="gallery-image" style="background-image: url('{image}')"></div>
    <div class="gallery-overlay">
      <h3>{title}</h3>
      <p>{description}</p>
    </div>
  </article>
</div>
"#
    )
}

/// Renders only the pager's visible slice, tagged with the slide direction.
/// The range is clamped to the list, so a pager built for a different total
/// renders whatever overlap exists instead of panicking.
pub fn gallery_page(items: &[Record], pager: &GalleryPager) -> String {
    let slide_class = match pager.direction() {
        Direction::Forward => "slide-forward",
        Direction::Back => "slide-back",
    };

    let range = pager.visible_range();
    let end = range.end.min(items.len());
    let start = range.start.min(end);
    let cards: String = items[start..end].iter().map(gallery_item).collect();

    format!(r#"<div class="gallery-grid {slide_class}">{cards}</div>"#)
}
