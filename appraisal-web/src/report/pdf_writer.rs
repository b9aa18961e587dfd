//! Serialize a [`ReportLayout`] into PDF bytes
//!
//! Both faces are embedded (see [`super::fonts`]).

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use super::fonts::EmbeddedFont;
use super::layout::{DrawOp, Font, Page, ReportLayout, Rgb, FONT_SIZE, PAGE_HEIGHT, PAGE_WIDTH};
use super::ReportError;

const BOX_BORDER_WIDTH: f32 = 2.0;

fn font_name(font: Font) -> &'static str {
    match font {
        Font::Regular => "F1",
        Font::Bold => "F2",
    }
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![color.0.into(), color.1.into(), color.2.into()]
}

struct Fonts {
    regular: EmbeddedFont,
    bold: EmbeddedFont,
}

impl Fonts {
    fn load() -> Result<Self, ReportError> {
        Ok(Self {
            regular: EmbeddedFont::load(Font::Regular)?,
            bold: EmbeddedFont::load(Font::Bold)?,
        })
    }

    fn get_mut(&mut self, font: Font) -> &mut EmbeddedFont {
        match font {
            Font::Regular => &mut self.regular,
            Font::Bold => &mut self.bold,
        }
    }
}

fn page_operations(page: &Page, fonts: &mut Fonts) -> Vec<Operation> {
    let mut ops = Vec::new();
    for op in &page.ops {
        match op {
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                stroke,
                fill,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("w", vec![BOX_BORDER_WIDTH.into()]));
                ops.push(Operation::new("RG", color_operands(*stroke)));
                ops.push(Operation::new("rg", color_operands(*fill)));
                ops.push(Operation::new(
                    "re",
                    vec![(*x).into(), (*y).into(), (*width).into(), (*height).into()],
                ));
                ops.push(Operation::new("B", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::Text {
                x,
                y,
                text,
                font,
                color,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![font_name(*font).into(), FONT_SIZE.into()],
                ));
                ops.push(Operation::new("rg", color_operands(*color)));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        fonts.get_mut(*font).encode(text),
                        StringFormat::Hexadecimal,
                    )],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
        }
    }
    ops
}

/// Render the layout into a complete PDF file
pub fn write_pdf(layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut fonts = Fonts::load()?;

    let mut kids = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let content = Content {
            operations: page_operations(page, &mut fonts),
        };
        let encoded = content
            .encode()
            .map_err(|e| ReportError::Render(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    // Widths and ToUnicode only cover glyphs drawn above
    let regular_id = fonts.regular.embed(&mut doc);
    let bold_id = fonts.bold.embed(&mut doc);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ReportError::Render(e.to_string()))?;
    Ok(bytes)
}
