//! Embedded TrueType faces for the report
//!
//! DejaVu Sans covers the whole Czech alphabet. Text is shown as two-byte
//! glyph ids (`Identity-H`) and every font carries a `ToUnicode` map, so the
//! labels survive copy-and-paste and text extraction unchanged.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use ttf_parser::{Face, GlyphId};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::layout::Font;
use super::ReportError;

static DEJAVU_SANS: &[u8] = include_bytes!("../../fonts/DejaVuSans.ttf");
static DEJAVU_SANS_BOLD: &[u8] = include_bytes!("../../fonts/DejaVuSans-Bold.ttf");

/// bfchar blocks are limited to 100 entries each
const CMAP_BLOCK: usize = 100;

/// One face plus the glyphs a document drew with it
pub struct EmbeddedFont {
    base_font: &'static str,
    data: &'static [u8],
    face: Face<'static>,
    used: BTreeMap<u16, char>,
}

impl EmbeddedFont {
    pub fn load(font: Font) -> Result<Self, ReportError> {
        let (base_font, data) = match font {
            Font::Regular => ("DejaVuSans", DEJAVU_SANS),
            Font::Bold => ("DejaVuSans-Bold", DEJAVU_SANS_BOLD),
        };
        let face = Face::parse(data, 0)
            .map_err(|e| ReportError::Render(format!("{}: {}", base_font, e)))?;
        Ok(Self {
            base_font,
            data,
            face,
            used: BTreeMap::new(),
        })
    }

    /// Encode text as big-endian glyph ids and remember which were used
    pub fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let c = if c.is_control() { ' ' } else { c };
            for (glyph, source) in self.glyphs(c) {
                self.used.entry(glyph.0).or_insert(source);
                out.extend_from_slice(&glyph.0.to_be_bytes());
            }
        }
        out
    }

    /// Characters the face lacks fall back to their base letters, then to `?`
    fn glyphs(&self, c: char) -> Vec<(GlyphId, char)> {
        if let Some(glyph) = self.face.glyph_index(c) {
            return vec![(glyph, c)];
        }
        let base: Vec<(GlyphId, char)> = std::iter::once(c)
            .nfd()
            .filter(|b| !is_combining_mark(*b) && *b != c)
            .filter_map(|b| self.face.glyph_index(b).map(|glyph| (glyph, b)))
            .collect();
        if !base.is_empty() {
            return base;
        }
        self.face
            .glyph_index('?')
            .map(|glyph| vec![(glyph, '?')])
            .unwrap_or_default()
    }

    /// Font units to PDF text space (thousandths of an em)
    fn scale(&self, value: i32) -> i64 {
        i64::from(value) * 1000 / i64::from(self.face.units_per_em().max(1))
    }

    fn widths(&self) -> Vec<Object> {
        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for &glyph in self.used.keys() {
            let advance = self.face.glyph_hor_advance(GlyphId(glyph)).unwrap_or(0);
            widths.push(Object::from(glyph));
            widths.push(Object::Array(vec![self.scale(i32::from(advance)).into()]));
        }
        widths
    }

    fn to_unicode_cmap(&self) -> String {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo\n\
             << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );
        let entries: Vec<(&u16, &char)> = self.used.iter().collect();
        for block in entries.chunks(CMAP_BLOCK) {
            let _ = writeln!(cmap, "{} beginbfchar", block.len());
            for (glyph, c) in block {
                let mut units = [0u16; 2];
                let target: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|unit| format!("{:04X}", unit))
                    .collect();
                let _ = writeln!(cmap, "<{:04X}> <{}>", glyph, target);
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );
        cmap
    }

    /// Add the Type0 font with its descendant, descriptor, font file and
    /// ToUnicode map; returns the Type0 dictionary id
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let bbox = self.face.global_bounding_box();
        let ascent = self.face.ascender();
        let cap_height = self.face.capital_height().unwrap_or(ascent);

        let file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => self.data.len() as i64 },
            self.data.to_vec(),
        ));
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => self.base_font,
            "Flags" => 32,
            "FontBBox" => vec![
                self.scale(bbox.x_min.into()).into(),
                self.scale(bbox.y_min.into()).into(),
                self.scale(bbox.x_max.into()).into(),
                self.scale(bbox.y_max.into()).into(),
            ],
            "ItalicAngle" => 0,
            "Ascent" => self.scale(ascent.into()),
            "Descent" => self.scale(self.face.descender().into()),
            "CapHeight" => self.scale(cap_height.into()),
            "StemV" => 80,
            "FontFile2" => file_id,
        });
        let descendant_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => self.base_font,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "CIDToGIDMap" => "Identity",
            "W" => self.widths(),
        });
        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            self.to_unicode_cmap().into_bytes(),
        ));
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => self.base_font,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::from(descendant_id)],
            "ToUnicode" => to_unicode_id,
        })
    }
}
