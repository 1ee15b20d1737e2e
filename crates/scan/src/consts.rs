use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Every image with a source, wherever it sits in the page.
selector!(IMAGE_SELECTOR, "img[src]");
regex!(RASTER_EXTENSION_REGEX, r"(?i)^(?:gif|png|jpe?g|webp|bmp|apng)$");
