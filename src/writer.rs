//! PDF 1.3 serializer: collects an object graph, assigns numbering and
//! emits body, cross-reference table and trailer, optionally encrypting
//! with the Standard Security Handler.

use crate::encryption::{AccessPermissions, Crypter};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, IndirectObject, Name, ObjectId, PdfObject, PdfString};
use log::{debug, error};
use rand::RngCore;
use std::collections::HashSet;
use std::io::{BufWriter, Seek, Write};
use std::rc::Rc;

/// Options accepted by [`PdfWriter::encrypt`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptOptions {
    pub permissions: AccessPermissions,
}

/// Serializes an object graph as a PDF 1.3 file. Objects are emitted in
/// the order they were first recorded, so numbering is deterministic for a
/// given call sequence.
pub struct PdfWriter {
    objects: Vec<PdfObject>,
    object_set: HashSet<usize>,
    catalog: Rc<IndirectObject>,
    pages: Rc<IndirectObject>,
    info: Rc<IndirectObject>,
    outlines: Vec<Rc<IndirectObject>>,
    fields: Vec<PdfObject>,
    crypter: Option<Crypter>,
    encrypt_obj: Option<Rc<IndirectObject>>,
    ids: Option<PdfObject>,
}

const INHERITED_PAGE_FIELDS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    /// Seed the document: info dictionary, catalog and an empty pages
    /// root, recorded in that order.
    pub fn new() -> Self {
        let mut info_dict = Dictionary::new();
        info_dict.set(
            "Producer",
            PdfString::literal(format!("pdfgraph {}", env!("CARGO_PKG_VERSION")).into_bytes()),
        );
        info_dict.set("Creator", PdfString::literal(b"pdfgraph".to_vec()));
        let date = format!("D:{}", chrono::Local::now().format("%Y%m%d%H%M%S%z"));
        info_dict.set("CreationDate", PdfString::literal(date.clone().into_bytes()));
        info_dict.set("ModDate", PdfString::literal(date.into_bytes()));
        let info = IndirectObject::new(PdfObject::Dictionary(info_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.set("Type", Name::new("Catalog"));
        catalog_dict.set("Version", Name::new("1.3"));
        let catalog = IndirectObject::new(PdfObject::Dictionary(catalog_dict));

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Name::new("Pages"));
        pages_dict.set("Kids", Vec::<PdfObject>::new());
        pages_dict.set("Count", 0i64);
        let pages = IndirectObject::new(PdfObject::Dictionary(pages_dict));

        if let Some(dict) = catalog.object.borrow_mut().as_dict_mut() {
            dict.set("Pages", PdfObject::Indirect(pages.clone()));
        }

        let mut writer = Self {
            objects: Vec::new(),
            object_set: HashSet::new(),
            catalog: catalog.clone(),
            pages: pages.clone(),
            info: info.clone(),
            outlines: Vec::new(),
            fields: Vec::new(),
            crypter: None,
            encrypt_obj: None,
            ids: None,
        };
        writer.add_object(&PdfObject::Indirect(info));
        writer.add_object(&PdfObject::Indirect(catalog));
        writer.add_object(&PdfObject::Indirect(pages));
        writer
    }

    fn has_object(&self, obj: &PdfObject) -> bool {
        obj.node_address()
            .map(|addr| self.object_set.contains(&addr))
            .unwrap_or(false)
    }

    /// Record a node once; returns whether it was newly added.
    fn add_object(&mut self, obj: &PdfObject) -> bool {
        let addr = match obj.node_address() {
            Some(addr) => addr,
            None => return false,
        };
        if self.object_set.insert(addr) {
            self.objects.push(obj.clone());
            true
        } else {
            false
        }
    }

    /// Record every indirect object and stream reachable from `obj`, each
    /// once, never descending through `/Parent`. A bare reference is an
    /// invariant violation: the reader resolves everything it hands out.
    fn add_objects(&mut self, obj: &PdfObject) -> Result<()> {
        match obj {
            PdfObject::Indirect(io) => {
                if self.add_object(obj) {
                    let inner = io.object.borrow();
                    self.add_objects(&inner)?;
                }
                Ok(())
            }
            PdfObject::Stream(stream) => {
                if self.add_object(obj) {
                    let dict = stream.dict.borrow();
                    for (key, value) in dict.iter() {
                        if key.as_str() != "Parent" {
                            self.add_objects(value)?;
                        }
                    }
                }
                Ok(())
            }
            PdfObject::Dictionary(dict) => {
                for (key, value) in dict.iter() {
                    if key.as_str() != "Parent" {
                        self.add_objects(value)?;
                    }
                }
                Ok(())
            }
            PdfObject::Array(items) => {
                for item in items {
                    self.add_objects(item)?;
                }
                Ok(())
            }
            PdfObject::Reference(id) => {
                error!("unresolved reference {id} handed to the writer");
                Err(PdfError::UnresolvedReference(*id))
            }
            _ => Ok(()),
        }
    }

    /// Add a page leaf. Inherited attributes are hoisted from the original
    /// parent chain into the leaf, then `/Parent` is repointed at this
    /// writer's pages root and the page's subtree recorded.
    pub fn add_page(&mut self, page: &Rc<IndirectObject>) -> Result<()> {
        {
            let inner = page.object.borrow();
            let dict = inner
                .as_dict()
                .ok_or_else(|| PdfError::InvalidPageNode("page is not a dictionary".to_string()))?;
            let is_page = dict
                .get("Type")
                .and_then(|obj| obj.as_name())
                .map(|name| name.as_str() == "Page")
                .unwrap_or(false);
            if !is_page {
                return Err(PdfError::InvalidPageNode("/Type must be Page".to_string()));
            }
        }

        // hoist inherited attributes before /Parent is overwritten
        self.inherit_page_attributes(page)?;

        {
            let mut inner = page.object.borrow_mut();
            if let Some(dict) = inner.as_dict_mut() {
                dict.set("Parent", PdfObject::Indirect(self.pages.clone()));
            }
        }

        {
            let mut inner = self.pages.object.borrow_mut();
            let dict = inner.as_dict_mut().expect("pages root is a dictionary");
            if let Some(PdfObject::Array(kids)) = dict.get_mut("Kids") {
                kids.push(PdfObject::Indirect(page.clone()));
            }
            let count = dict.get("Count").and_then(|obj| obj.as_integer()).unwrap_or(0);
            dict.set("Count", count + 1);
        }

        self.add_object(&PdfObject::Indirect(page.clone()));
        let inner = page.object.borrow();
        self.add_objects(&inner)?;
        Ok(())
    }

    /// Walk the original ancestor chain copying inheritable attributes the
    /// leaf is missing, by shared ownership.
    fn inherit_page_attributes(&self, page: &Rc<IndirectObject>) -> Result<()> {
        let mut visited = HashSet::new();
        let mut parent = {
            let inner = page.object.borrow();
            inner
                .as_dict()
                .and_then(|dict| dict.get("Parent"))
                .and_then(|obj| obj.as_indirect())
                .cloned()
        };

        while let Some(ancestor) = parent {
            if !visited.insert(Rc::as_ptr(&ancestor) as usize) {
                break;
            }
            let (copies, next) = {
                let inner = ancestor.object.borrow();
                let dict = inner.as_dict().ok_or_else(|| {
                    PdfError::InvalidPageNode("page /Parent is not a dictionary".to_string())
                })?;
                let page_inner = page.object.borrow();
                let page_dict = page_inner.as_dict().expect("validated above");

                let copies: Vec<(Name, PdfObject)> = INHERITED_PAGE_FIELDS
                    .iter()
                    .copied()
                    .filter(|&field| !page_dict.contains_key(field))
                    .filter_map(|field| {
                        dict.get(field).map(|value| (Name::new(field), value.clone()))
                    })
                    .collect();
                let next = dict
                    .get("Parent")
                    .and_then(|obj| obj.as_indirect())
                    .cloned();
                (copies, next)
            };
            if !copies.is_empty() {
                let mut inner = page.object.borrow_mut();
                if let Some(dict) = inner.as_dict_mut() {
                    for (field, value) in copies {
                        debug!("inheriting /{} into page", field.as_str());
                        dict.set(field, value);
                    }
                }
            }
            parent = next;
        }
        Ok(())
    }

    /// Stash top-level outline items; sibling and parent links are
    /// synthesized at write time.
    pub fn add_outlines(&mut self, outlines: &[Rc<IndirectObject>]) {
        self.outlines.extend_from_slice(outlines);
    }

    /// Collect every value under `key`, descending only through
    /// `follow_keys`.
    fn seek_by_name(obj: &PdfObject, follow_keys: &[&str], key: &str, out: &mut Vec<PdfObject>) {
        match obj {
            PdfObject::Indirect(io) => {
                Self::seek_by_name(&io.object.borrow(), follow_keys, key, out)
            }
            PdfObject::Stream(stream) => {
                let dict = stream.dict.borrow().clone();
                Self::seek_by_name(&PdfObject::Dictionary(dict), follow_keys, key, out)
            }
            PdfObject::Dictionary(dict) => {
                for (name, value) in dict.iter() {
                    if name.as_str() == key {
                        out.push(value.clone());
                    }
                    if follow_keys.contains(&name.as_str()) {
                        Self::seek_by_name(value, follow_keys, key, out);
                    }
                }
            }
            _ => {}
        }
    }

    /// Add form fields whose every `/P` destination is a page this writer
    /// already holds. Any `/P` outside the writer's object set fails the
    /// whole call.
    pub fn add_forms(&mut self, forms: &Dictionary) -> Result<()> {
        let fields_array = match forms.get("Fields") {
            Some(PdfObject::Array(fields)) => Some(fields.clone()),
            Some(PdfObject::Indirect(io)) => io.object.borrow().as_array().cloned(),
            _ => None,
        };
        let fields_array = match fields_array {
            Some(fields) => fields,
            None => {
                debug!("no fields to add from forms dictionary");
                return Ok(());
            }
        };

        for field in fields_array {
            if field.as_indirect().is_none() {
                return Err(PdfError::InvalidAcroForm(
                    "field is not an indirect object".to_string(),
                ));
            }

            let mut destinations = Vec::new();
            Self::seek_by_name(&field, &["Fields", "Kids"], "P", &mut destinations);
            if destinations.is_empty() {
                continue;
            }

            let mut include = false;
            for dest in &destinations {
                match dest {
                    PdfObject::Indirect(_) => {
                        if self.has_object(dest) {
                            include = true;
                        } else {
                            error!("form field /P points outside the written pages");
                            return Err(PdfError::FormFieldOutsideWriter);
                        }
                    }
                    other => {
                        error!("form field /P entry is not an indirect object: {other:?}");
                    }
                }
            }

            if include {
                self.add_object(&field);
                self.fields.push(field);
            }
        }
        Ok(())
    }

    /// Install the Standard Security Handler (V=2, R=3, 128-bit). Strings
    /// and stream payloads are encrypted during `write`.
    pub fn encrypt(
        &mut self,
        user_password: &[u8],
        owner_password: &[u8],
        options: Option<EncryptOptions>,
    ) -> Result<()> {
        let p = options.map(|opts| opts.permissions.p()).unwrap_or(-1);

        // trailer /ID: id0 hashes the current timestamp, id1 hashes fresh
        // random bytes
        let timestamp = chrono::Local::now()
            .format("%A, %d-%b-%y %H:%M:%S %Z")
            .to_string();
        let id0 = md5::compute(timestamp.as_bytes()).0.to_vec();
        let mut seed = [0u8; 100];
        rand::thread_rng().fill_bytes(&mut seed);
        let id1 = md5::compute(seed).0.to_vec();
        self.ids = Some(PdfObject::Array(vec![
            PdfObject::String(PdfString::hexadecimal(id0.clone())),
            PdfObject::String(PdfString::hexadecimal(id1)),
        ]));

        let crypter = Crypter::for_writing(p, id0, user_password, owner_password);

        let mut enc_dict = Dictionary::new();
        enc_dict.set("Filter", Name::new("Standard"));
        enc_dict.set("V", crypter.version());
        enc_dict.set("R", crypter.revision() as i64);
        enc_dict.set("Length", crypter.key_length_bits());
        enc_dict.set("P", p as i64);
        enc_dict.set("O", PdfString::literal(crypter.o.clone()));
        enc_dict.set("U", PdfString::literal(crypter.u.clone()));

        let encrypt_obj = IndirectObject::new(PdfObject::Dictionary(enc_dict));
        self.add_object(&PdfObject::Indirect(encrypt_obj.clone()));
        self.encrypt_obj = Some(encrypt_obj);
        self.crypter = Some(crypter);
        Ok(())
    }

    /// Emit the file: header, object bodies (encrypting in place when a
    /// crypter is installed), cross-reference table and trailer. Offsets
    /// are taken from the flushed sink immediately before each body.
    pub fn write<W: Write + Seek>(&mut self, sink: W) -> Result<()> {
        self.synthesize_outlines()?;
        self.synthesize_forms()?;

        let mut out = BufWriter::new(sink);
        out.write_all(b"%PDF-1.3\n")?;
        out.write_all(b"%\xE2\xE3\xCF\xD3\n")?;

        self.update_object_numbers();

        debug!("writing {} objects", self.objects.len());
        let mut offsets = Vec::with_capacity(self.objects.len());
        for idx in 0..self.objects.len() {
            let obj = self.objects[idx].clone();
            out.flush()?;
            offsets.push(out.stream_position()?);

            // everything except the encryption dictionary itself
            if let Some(crypter) = self.crypter.as_mut() {
                let is_encrypt_dict = match (&obj, &self.encrypt_obj) {
                    (PdfObject::Indirect(io), Some(enc)) => Rc::ptr_eq(io, enc),
                    _ => false,
                };
                if !is_encrypt_dict {
                    crypter.process_object(&obj, ObjectId::new(idx as u32 + 1, 0))?;
                }
            }

            write_object_body(&mut out, &obj)?;
        }

        out.flush()?;
        let xref_offset = out.stream_position()?;

        out.write_all(b"xref\r\n")?;
        out.write_all(format!("0 {}\r\n", self.objects.len() + 1).as_bytes())?;
        out.write_all(b"0000000000 65535 f\r\n")?;
        for offset in &offsets {
            out.write_all(format!("{offset:010} {:05} n\r\n", 0).as_bytes())?;
        }

        let mut trailer = Dictionary::new();
        trailer.set("Size", (self.objects.len() + 1) as i64);
        trailer.set("Root", PdfObject::Indirect(self.catalog.clone()));
        trailer.set("Info", PdfObject::Indirect(self.info.clone()));
        if self.crypter.is_some() {
            if let Some(encrypt_obj) = &self.encrypt_obj {
                trailer.set("Encrypt", PdfObject::Indirect(encrypt_obj.clone()));
            }
            if let Some(ids) = &self.ids {
                trailer.set("ID", ids.clone());
            }
        }
        out.write_all(b"trailer\n")?;
        out.write_all(&PdfObject::Dictionary(trailer).to_wire_bytes())?;
        out.write_all(b"\n")?;

        out.write_all(format!("startxref\n{xref_offset}\n").as_bytes())?;
        out.write_all(b"%%EOF\n")?;
        out.flush()?;
        Ok(())
    }

    /// Build the outline parent node and link the stashed items as
    /// siblings under it.
    fn synthesize_outlines(&mut self) -> Result<()> {
        if self.outlines.is_empty() {
            return Ok(());
        }
        let mut outlines_dict = Dictionary::new();
        outlines_dict.set("Type", Name::new("Outlines"));
        outlines_dict.set("First", PdfObject::Indirect(self.outlines[0].clone()));
        outlines_dict.set(
            "Last",
            PdfObject::Indirect(self.outlines[self.outlines.len() - 1].clone()),
        );
        let outlines_obj = IndirectObject::new(PdfObject::Dictionary(outlines_dict));

        if let Some(dict) = self.catalog.object.borrow_mut().as_dict_mut() {
            dict.set("Outlines", PdfObject::Indirect(outlines_obj.clone()));
        }

        let count = self.outlines.len();
        for idx in 0..count {
            let item = self.outlines[idx].clone();
            let mut inner = item.object.borrow_mut();
            let dict = match inner.as_dict_mut() {
                Some(dict) => dict,
                None => continue,
            };
            if idx + 1 < count {
                dict.set("Next", PdfObject::Indirect(self.outlines[idx + 1].clone()));
            }
            if idx > 0 {
                dict.set("Prev", PdfObject::Indirect(self.outlines[idx - 1].clone()));
            }
            dict.set("Parent", PdfObject::Indirect(outlines_obj.clone()));
        }

        self.add_objects(&PdfObject::Indirect(outlines_obj))
    }

    /// Wrap the collected fields in a fresh AcroForm dictionary hooked into
    /// the catalog.
    fn synthesize_forms(&mut self) -> Result<()> {
        if self.fields.is_empty() {
            return Ok(());
        }
        let mut forms_dict = Dictionary::new();
        forms_dict.set("Fields", PdfObject::Array(self.fields.clone()));
        let forms_obj = IndirectObject::new(PdfObject::Dictionary(forms_dict));

        if let Some(dict) = self.catalog.object.borrow_mut().as_dict_mut() {
            dict.set("AcroForm", PdfObject::Indirect(forms_obj.clone()));
        }
        self.add_objects(&PdfObject::Indirect(forms_obj))
    }

    /// Assign `idx + 1`, generation 0, in recorded order. Object 0 is the
    /// reserved free object.
    fn update_object_numbers(&self) {
        for (idx, obj) in self.objects.iter().enumerate() {
            let id = ObjectId::new(idx as u32 + 1, 0);
            match obj {
                PdfObject::Indirect(io) => io.set_id(id),
                PdfObject::Stream(stream) => stream.set_id(id),
                _ => {}
            }
        }
    }
}

fn write_object_body<W: Write>(out: &mut W, obj: &PdfObject) -> Result<()> {
    match obj {
        PdfObject::Indirect(io) => {
            let id = io.id();
            out.write_all(format!("{} {} obj\n", id.number(), id.generation()).as_bytes())?;
            out.write_all(&io.object.borrow().to_wire_bytes())?;
            out.write_all(b"\nendobj\n")?;
            Ok(())
        }
        PdfObject::Stream(stream) => {
            let id = stream.id();
            let data = stream.data.borrow();
            // /Length must agree with the payload being emitted
            stream
                .dict
                .borrow_mut()
                .set("Length", data.len() as i64);
            out.write_all(format!("{} {} obj\n", id.number(), id.generation()).as_bytes())?;
            let mut dict_bytes = Vec::new();
            stream.dict.borrow().write_wire(&mut dict_bytes);
            out.write_all(&dict_bytes)?;
            out.write_all(b"\nstream\n")?;
            out.write_all(&data)?;
            out.write_all(b"\nendstream\nendobj\n")?;
            Ok(())
        }
        other => {
            out.write_all(&other.to_wire_bytes())?;
            Ok(())
        }
    }
}
