//! Pages: tree navigation, attribute inheritance, fonts, and content.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::document::reader::Reader;
use crate::document::value::{Kind, Value};
use crate::error::Result;
use crate::font::font::Font;
use crate::interp::content::page_content;
use crate::model::state::Content;

/// Upper bound on Parent-chain and page-tree walks; real trees are
/// shallow, so hitting this means a reference cycle.
const MAX_TREE_DEPTH: usize = 256;

/// A single page. A page whose value is Null represents "not found";
/// every operation on it yields empty results.
pub struct Page<'r> {
    v: Value<'r>,
    fonts: RefCell<HashMap<String, Rc<Font<'r>>>>,
}

impl<'r> Page<'r> {
    pub(crate) fn from_value(v: Value<'r>) -> Self {
        Self {
            v,
            fonts: RefCell::new(HashMap::new()),
        }
    }

    /// The null page.
    pub fn null() -> Self {
        Self::from_value(Value::null())
    }

    pub fn is_null(&self) -> bool {
        self.v.is_null()
    }

    /// The page dictionary.
    pub fn value(&self) -> &Value<'r> {
        &self.v
    }

    /// Walks up the Parent chain until `key` is present.
    fn find_inherited(&self, key: &str) -> Result<Value<'r>> {
        let mut v = self.v.clone();
        for _ in 0..MAX_TREE_DEPTH {
            if v.is_null() {
                break;
            }
            let found = v.key(key)?;
            if !found.is_null() {
                return Ok(found);
            }
            v = v.key("Parent")?;
        }
        Ok(Value::null())
    }

    pub fn media_box(&self) -> Result<Value<'r>> {
        self.find_inherited("MediaBox")
    }

    pub fn crop_box(&self) -> Result<Value<'r>> {
        self.find_inherited("CropBox")
    }

    pub fn resources(&self) -> Result<Value<'r>> {
        self.find_inherited("Resources")
    }

    /// Names of the fonts in the page's resources.
    pub fn fonts(&self) -> Vec<String> {
        self.resources()
            .and_then(|r| r.key("Font"))
            .map(|f| f.keys())
            .unwrap_or_default()
    }

    /// The font with the given resource name, cached per page.
    pub fn font(&self, name: &str) -> Rc<Font<'r>> {
        if let Some(f) = self.fonts.borrow().get(name) {
            return Rc::clone(f);
        }
        let v = self
            .resources()
            .and_then(|r| r.key("Font"))
            .and_then(|f| f.key(name))
            .unwrap_or_else(|_| Value::null());
        let font = Rc::new(Font::from_value(v));
        self.fonts
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&font));
        font
    }

    /// Extracted text runs and vector paths.
    pub fn content(&self) -> Result<Content> {
        if self.is_null() {
            return Ok(Content::default());
        }
        page_content(self)
    }
}

/// One node of the document outline tree. The root carries no title of
/// its own; its children are the top-level entries.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub title: String,
    pub children: Vec<Outline>,
}

impl<'a> Reader<'a> {
    /// The page count, from `/Root/Pages/Count`.
    pub fn num_pages(&self) -> i64 {
        self.trailer()
            .key("Root")
            .and_then(|r| r.key("Pages"))
            .and_then(|p| p.key("Count"))
            .and_then(|c| c.as_i64())
            .unwrap_or(0)
    }

    /// The page with the given 1-indexed number, or the null page.
    pub fn page(&self, num: usize) -> Page<'_> {
        match self.find_page(num) {
            Ok(Some(v)) => Page::from_value(v),
            _ => Page::null(),
        }
    }

    fn find_page(&self, num: usize) -> Result<Option<Value<'_>>> {
        if num == 0 {
            return Ok(None);
        }
        let mut remaining = (num - 1) as i64;
        let mut node = self.trailer().key("Root")?.key("Pages")?;

        // Descend by Count: a Pages kid containing the target absorbs
        // the walk; Page leaves count down the remainder.
        'search: for _ in 0..MAX_TREE_DEPTH {
            if node.key("Type")?.as_name().unwrap_or("") != "Pages" {
                return Ok(None);
            }
            let count = node.key("Count")?.as_i64().unwrap_or(-1);
            if remaining >= count {
                return Ok(None);
            }
            let kids = node.key("Kids")?;
            for i in 0..kids.len() {
                let kid = kids.index(i)?;
                match kid.key("Type")?.as_name().unwrap_or("") {
                    "Pages" => {
                        let c = kid.key("Count")?.as_i64().unwrap_or(0);
                        if remaining < c {
                            node = kid;
                            continue 'search;
                        }
                        remaining -= c;
                    }
                    "Page" => {
                        if remaining == 0 {
                            return Ok(Some(kid));
                        }
                        remaining -= 1;
                    }
                    _ => {}
                }
            }
            return Ok(None);
        }
        Ok(None)
    }

    /// The document outline built from `/Root/Outlines`.
    pub fn outline(&self) -> Outline {
        let root = self
            .trailer()
            .key("Root")
            .and_then(|r| r.key("Outlines"))
            .unwrap_or_else(|_| Value::null());
        build_outline(&root, 0)
    }
}

fn build_outline(entry: &Value<'_>, depth: usize) -> Outline {
    let mut node = Outline {
        title: entry
            .key("Title")
            .map(|t| t.text())
            .unwrap_or_default(),
        children: Vec::new(),
    };
    if depth >= MAX_TREE_DEPTH {
        return node;
    }

    let mut child = entry.key("First").unwrap_or_else(|_| Value::null());
    let mut guard = 0;
    while child.kind() == Kind::Dict {
        node.children.push(build_outline(&child, depth + 1));
        child = match child.key("Next") {
            Ok(next) => next,
            Err(_) => break,
        };
        guard += 1;
        if guard > 8192 {
            break;
        }
    }
    node
}
