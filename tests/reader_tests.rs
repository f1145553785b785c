//! Reader scenarios over hand-built fixtures.

mod common;

use common::build_pdf;
use pdfgraph::{PdfError, PdfObject, PdfReader};
use std::io::Cursor;
use std::rc::Rc;

fn open(bytes: Vec<u8>) -> PdfReader<Cursor<Vec<u8>>> {
    PdfReader::new(Cursor::new(bytes)).expect("fixture should parse")
}

fn single_page_pdf() -> Vec<u8> {
    build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>",
        ],
        1,
    )
}

#[test]
fn single_page_document() {
    let mut reader = open(single_page_pdf());
    assert_eq!(reader.num_pages().unwrap(), 1);

    let page = reader.page(1).unwrap();
    let inner = page.object.borrow();
    let dict = inner.as_dict().unwrap();
    assert_eq!(
        dict.get("Type").and_then(|o| o.as_name()).unwrap().as_str(),
        "Page"
    );

    // the parent back-edge points at the pages root
    let parent = dict.get("Parent").and_then(|o| o.as_indirect()).unwrap();
    let parent_inner = parent.object.borrow();
    assert_eq!(
        parent_inner
            .as_dict()
            .unwrap()
            .get("Type")
            .and_then(|o| o.as_name())
            .unwrap()
            .as_str(),
        "Pages"
    );
}

#[test]
fn num_pages_matches_declared_count() {
    let mut reader = open(single_page_pdf());
    let page = reader.page(1).unwrap();
    let inner = page.object.borrow();
    let parent = inner
        .as_dict()
        .unwrap()
        .get("Parent")
        .and_then(|o| o.as_indirect())
        .unwrap();
    let parent_inner = parent.object.borrow();
    let declared = parent_inner
        .as_dict()
        .unwrap()
        .get("Count")
        .and_then(|o| o.as_integer())
        .unwrap();
    assert_eq!(declared as usize, reader.num_pages().unwrap());
}

#[test]
fn nested_pages_tree_flattens_in_preorder() {
    // root -> [A, B], A -> [p1, p2], B -> [p3]
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 3 >>",
            "<< /Type /Pages /Parent 2 0 R /Kids [5 0 R 6 0 R] /Count 2 >>",
            "<< /Type /Pages /Parent 2 0 R /Kids [7 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 3 0 R /MediaBox [0 0 100 100] >>",
            "<< /Type /Page /Parent 3 0 R /MediaBox [0 0 200 200] >>",
            "<< /Type /Page /Parent 4 0 R /MediaBox [0 0 300 300] >>",
        ],
        1,
    );
    let mut reader = open(bytes);
    assert_eq!(reader.num_pages().unwrap(), 3);

    // page order follows preorder traversal: p1, p2, p3
    let widths: Vec<i64> = (1..=3)
        .map(|n| {
            let page = reader.page(n).unwrap();
            let inner = page.object.borrow();
            inner
                .as_dict()
                .unwrap()
                .get("MediaBox")
                .and_then(|o| o.as_array())
                .unwrap()[2]
                .as_integer()
                .unwrap()
        })
        .collect();
    assert_eq!(widths, vec![100, 200, 300]);

    // p1 and p2 share a parent; p3 has a different one
    let parent_of = |reader: &mut PdfReader<Cursor<Vec<u8>>>, n: usize| {
        let page = reader.page(n).unwrap();
        let inner = page.object.borrow();
        inner
            .as_dict()
            .unwrap()
            .get("Parent")
            .and_then(|o| o.as_indirect())
            .cloned()
            .unwrap()
    };
    let a1 = parent_of(&mut reader, 1);
    let a2 = parent_of(&mut reader, 2);
    let b = parent_of(&mut reader, 3);
    assert!(Rc::ptr_eq(&a1, &a2));
    assert!(!Rc::ptr_eq(&a1, &b));
}

#[test]
fn missing_parent_is_supplied() {
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /MediaBox [0 0 612 792] >>",
        ],
        1,
    );
    let mut reader = open(bytes);
    let page = reader.page(1).unwrap();
    let inner = page.object.borrow();
    let parent = inner.as_dict().unwrap().get("Parent");
    assert!(matches!(parent, Some(PdfObject::Indirect(_))));
}

#[test]
fn page_number_out_of_range() {
    let mut reader = open(single_page_pdf());
    assert!(matches!(
        reader.page(0),
        Err(PdfError::PageOutOfRange { requested: 0, count: 1 })
    ));
    assert!(matches!(
        reader.page(2),
        Err(PdfError::PageOutOfRange { requested: 2, count: 1 })
    ));
}

/// Walk a resolved value asserting no reference nodes remain, skipping
/// /Parent paths.
fn assert_no_references(obj: &PdfObject, seen: &mut Vec<usize>) {
    match obj {
        PdfObject::Reference(id) => panic!("unresolved reference {id} in resolved graph"),
        PdfObject::Array(items) => {
            for item in items {
                assert_no_references(item, seen);
            }
        }
        PdfObject::Dictionary(dict) => {
            for (key, value) in dict.iter() {
                if key.as_str() != "Parent" {
                    assert_no_references(value, seen);
                }
            }
        }
        PdfObject::Indirect(io) => {
            let addr = Rc::as_ptr(io) as usize;
            if !seen.contains(&addr) {
                seen.push(addr);
                assert_no_references(&io.object.borrow(), seen);
            }
        }
        PdfObject::Stream(stream) => {
            let addr = Rc::as_ptr(stream) as usize;
            if !seen.contains(&addr) {
                seen.push(addr);
                let dict = stream.dict.borrow();
                for (key, value) in dict.iter() {
                    if key.as_str() != "Parent" {
                        assert_no_references(value, seen);
                    }
                }
            }
        }
        _ => {}
    }
}

#[test]
fn resolved_page_contains_no_references() {
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R /Resources 4 0 R /Contents 5 0 R >>",
            "<< /Font << /F1 6 0 R >> >>",
            "<< /Length 8 >>\nstream\nBT ET xx\nendstream",
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>",
        ],
        1,
    );
    let mut reader = open(bytes);
    let page = reader.page(1).unwrap();
    let mut seen = Vec::new();
    assert_no_references(&PdfObject::Indirect(page), &mut seen);
}

#[test]
fn outlines_collected_in_sibling_order() {
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R /Outlines 4 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "<< /Type /Outlines /First 5 0 R /Last 6 0 R >>",
            "<< /Title (first) /Parent 4 0 R /Next 6 0 R /Dest [3 0 R /Fit] >>",
            "<< /Title (second) /Parent 4 0 R /Prev 5 0 R >>",
        ],
        1,
    );
    let mut reader = open(bytes);
    let outlines = reader.outlines().unwrap();
    assert_eq!(outlines.len(), 2);

    let titles: Vec<Vec<u8>> = outlines
        .iter()
        .map(|outline| {
            let inner = outline.object.borrow();
            inner
                .as_dict()
                .unwrap()
                .get("Title")
                .and_then(|o| o.as_string())
                .unwrap()
                .data
                .clone()
        })
        .collect();
    assert_eq!(titles, vec![b"first".to_vec(), b"second".to_vec()]);
}

#[test]
fn outlines_for_page_matches_by_identity() {
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R /Outlines 4 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 7 0 R] /Count 2 >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "<< /Type /Outlines /First 5 0 R /Last 6 0 R >>",
            "<< /Title (to page 1) /Parent 4 0 R /Next 6 0 R /Dest [3 0 R /Fit] >>",
            "<< /Title (goto page 2) /Parent 4 0 R /A << /S /GoTo /D [7 0 R /Fit] >> >>",
            "<< /Type /Page /Parent 2 0 R >>",
        ],
        1,
    );
    let mut reader = open(bytes);
    let all = reader.outlines().unwrap();
    assert_eq!(all.len(), 2);

    let page1 = reader.page(1).unwrap();
    let page2 = reader.page(2).unwrap();

    let for_page1 = reader.outlines_for_page(&page1).unwrap();
    assert_eq!(for_page1.len(), 1);
    assert!(Rc::ptr_eq(&for_page1[0], &all[0]));

    let for_page2 = reader.outlines_for_page(&page2).unwrap();
    assert_eq!(for_page2.len(), 1);
    assert!(Rc::ptr_eq(&for_page2[0], &all[1]));

    // subset property: every match is one of the outermost outlines
    for outline in for_page1.iter().chain(for_page2.iter()) {
        assert!(all.iter().any(|o| Rc::ptr_eq(o, outline)));
    }
}

#[test]
fn circular_outline_chain_is_an_error() {
    // O1 -> /Next O2 -> /Next O1
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R /Outlines 4 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "<< /Type /Outlines /First 5 0 R /Last 6 0 R >>",
            "<< /Title (one) /Parent 4 0 R /Next 6 0 R >>",
            "<< /Title (two) /Parent 4 0 R /Next 5 0 R >>",
        ],
        1,
    );
    let result = PdfReader::new(Cursor::new(bytes));
    assert!(matches!(result, Err(PdfError::CircularOutline)));
}

#[test]
fn forms_dictionary_is_resolved() {
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R /AcroForm 4 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "<< /Fields [5 0 R] >>",
            "<< /T (name) /FT /Tx /P 3 0 R >>",
        ],
        1,
    );
    let reader = open(bytes);
    let forms = reader.forms().unwrap().expect("document has forms");
    let fields = forms.get("Fields").and_then(|o| o.as_array()).unwrap();
    assert_eq!(fields.len(), 1);
    // resolved: the field slot is a handle, not a reference
    assert!(matches!(fields[0], PdfObject::Indirect(_)));
}

#[test]
fn document_without_optional_sections() {
    let reader = open(single_page_pdf());
    assert!(reader.forms().unwrap().is_none());
}

#[test]
fn bad_page_node_type_is_an_error() {
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Font >>",
        ],
        1,
    );
    let result = PdfReader::new(Cursor::new(bytes));
    assert!(matches!(result, Err(PdfError::InvalidPageNode(_))));
}

#[test]
fn kids_behind_indirect_array() {
    let bytes = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids 4 0 R /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "[3 0 R]",
        ],
        1,
    );
    let mut reader = open(bytes);
    assert_eq!(reader.num_pages().unwrap(), 1);
    let page = reader.page(1).unwrap();
    assert_eq!(
        page.object
            .borrow()
            .as_dict()
            .unwrap()
            .get("Type")
            .and_then(|o| o.as_name())
            .unwrap()
            .as_str(),
        "Page"
    );
}
