//! High-level document reader: drives the parser, resolves the object
//! graph and flattens the page tree.

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, IndirectObject, PdfObject};
use crate::parser::PdfParser;
use log::{debug, error};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::rc::Rc;

/// Reads a PDF from a seekable byte source into a resolved in-memory
/// object graph. Owns the graph; callers share nodes by handle.
///
/// Traversal replaces every reference slot with the resolved handle, so
/// after `page(n)` the subtree reachable from that page (not following
/// `/Parent`) contains no reference nodes.
pub struct PdfReader<R: Read + Seek> {
    parser: PdfParser<R>,
    catalog: Option<Rc<IndirectObject>>,
    page_list: Vec<Rc<IndirectObject>>,
    outlines: Vec<Rc<IndirectObject>>,
    forms: Option<Dictionary>,
    /// Node identities already visited; lives for the reader's lifetime so
    /// repeated walks never redo work.
    traversed: HashSet<usize>,
}

impl PdfReader<File> {
    /// Open a PDF file from a path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

impl<R: Read + Seek> PdfReader<R> {
    /// Parse the header, xref chain and trailer. For unencrypted documents
    /// the full structure (catalog, page tree, outlines, forms) loads
    /// immediately; encrypted documents defer it until `decrypt`.
    pub fn new(source: R) -> Result<Self> {
        let parser = PdfParser::new(source)?;
        let mut reader = Self {
            parser,
            catalog: None,
            page_list: Vec::new(),
            outlines: Vec::new(),
            forms: None,
            traversed: HashSet::new(),
        };
        if !reader.parser.is_encrypted() {
            reader.load_structure()?;
        }
        Ok(reader)
    }

    pub fn is_encrypted(&self) -> bool {
        self.parser.is_encrypted()
    }

    /// Try the given password, then the empty password. On success the
    /// document structure is loaded and `true` returned.
    pub fn decrypt(&mut self, password: &[u8]) -> Result<bool> {
        if !self.parser.decrypt(password)? {
            return Ok(false);
        }
        if let Err(err) = self.load_structure() {
            error!("failed to load structure after decryption: {err}");
            return Err(err);
        }
        Ok(true)
    }

    fn require_decrypted(&self) -> Result<()> {
        if let Some(crypter) = &self.parser.crypter {
            if !crypter.authenticated {
                return Err(PdfError::NeedsPassword);
            }
        }
        Ok(())
    }

    fn load_structure(&mut self) -> Result<()> {
        self.require_decrypted()?;

        let root_ref = self
            .parser
            .trailer
            .get("Root")
            .and_then(|obj| obj.as_reference())
            .ok_or_else(|| PdfError::InvalidCatalog("trailer /Root must be a reference".to_string()))?;
        let catalog = self
            .parser
            .lookup_by_reference(root_ref)?
            .as_indirect()
            .cloned()
            .ok_or_else(|| PdfError::InvalidCatalog("missing catalog".to_string()))?;
        let pages_ref = {
            let inner = catalog.object.borrow();
            let dict = inner
                .as_dict()
                .ok_or_else(|| PdfError::InvalidCatalog("catalog is not a dictionary".to_string()))?;
            dict.get("Pages")
                .and_then(|obj| obj.as_reference())
                .ok_or_else(|| {
                    PdfError::InvalidCatalog("catalog /Pages must be a reference".to_string())
                })?
        };

        let pages_root = self
            .parser
            .lookup_by_reference(pages_ref)?
            .as_indirect()
            .cloned()
            .ok_or_else(|| PdfError::InvalidCatalog("invalid pages root".to_string()))?;
        {
            let inner = pages_root.object.borrow();
            let dict = inner
                .as_dict()
                .ok_or_else(|| PdfError::InvalidCatalog("pages root is not a dictionary".to_string()))?;
            dict.get("Count")
                .and_then(|obj| obj.as_integer())
                .ok_or_else(|| PdfError::InvalidCatalog("pages root /Count invalid".to_string()))?;
        }

        self.catalog = Some(catalog);
        self.page_list.clear();
        self.build_page_tree(&pages_root, None)?;
        debug!("page tree flattened: {} pages", self.page_list.len());

        self.outlines = self.load_outlines()?;
        self.forms = self.load_forms()?;
        Ok(())
    }

    /// Number of page leaves found by flattening the page tree.
    pub fn num_pages(&self) -> Result<usize> {
        self.require_decrypted()?;
        Ok(self.page_list.len())
    }

    /// The n-th page (1-based) with its whole subtree resolved, not
    /// following `/Parent`.
    pub fn page(&mut self, page_number: usize) -> Result<Rc<IndirectObject>> {
        self.require_decrypted()?;
        if page_number < 1 || page_number > self.page_list.len() {
            return Err(PdfError::PageOutOfRange {
                requested: page_number,
                count: self.page_list.len(),
            });
        }
        let page = self.page_list[page_number - 1].clone();
        self.traverse(&PdfObject::Indirect(page.clone()), &["Parent"])?;
        Ok(page)
    }

    /// Outermost outline entries, in sibling order.
    pub fn outlines(&mut self) -> Result<Vec<Rc<IndirectObject>>> {
        self.require_decrypted()?;
        self.load_outlines()
    }

    /// Outermost outline entries whose destination is `page`: either a
    /// direct `/Dest` array or a GoTo action's `/D` array, compared by
    /// node identity.
    pub fn outlines_for_page(&self, page: &Rc<IndirectObject>) -> Result<Vec<Rc<IndirectObject>>> {
        self.require_decrypted()?;
        let target = PdfObject::Indirect(page.clone());
        let mut matched = Vec::new();

        for outline in &self.outlines {
            let inner = outline.object.borrow();
            let dict = inner
                .as_dict()
                .ok_or_else(|| PdfError::InvalidOutline("entry is not a dictionary".to_string()))?;

            if destination_matches(dict.get("Dest"), &target) {
                matched.push(outline.clone());
            }

            // GoTo action destination, direct or behind an indirect handle
            let action = match dict.get("A") {
                Some(PdfObject::Dictionary(a)) => Some(a.clone()),
                Some(PdfObject::Indirect(io)) => io.object.borrow().as_dict().cloned(),
                _ => None,
            };
            if let Some(action) = action {
                let is_goto = action
                    .get("S")
                    .and_then(|obj| obj.as_name())
                    .map(|name| name.as_str() == "GoTo")
                    .unwrap_or(false);
                if is_goto && destination_matches(action.get("D"), &target) {
                    matched.push(outline.clone());
                }
            }
        }
        Ok(matched)
    }

    /// The resolved AcroForm dictionary, if the document has one. Indirect
    /// values inside it are shared handles into the reader's graph.
    pub fn forms(&self) -> Result<Option<&Dictionary>> {
        self.require_decrypted()?;
        Ok(self.forms.as_ref())
    }

    fn catalog(&self) -> Result<&Rc<IndirectObject>> {
        self.catalog
            .as_ref()
            .ok_or_else(|| PdfError::InvalidCatalog("structure not loaded".to_string()))
    }

    // --- outlines ----------------------------------------------------------

    fn load_outlines(&mut self) -> Result<Vec<Rc<IndirectObject>>> {
        let outlines_slot = {
            let catalog = self.catalog()?;
            let inner = catalog.object.borrow();
            match inner.as_dict().and_then(|dict| dict.get("Outlines")) {
                Some(slot @ (PdfObject::Reference(_) | PdfObject::Indirect(_))) => slot.clone(),
                _ => return Ok(Vec::new()),
            }
        };
        debug!("document has outlines");

        let outlines_obj = self.parser.trace(&outlines_slot)?;
        self.traverse(&outlines_obj, &["Parent"])?;

        let outlines_root = match outlines_obj.as_indirect() {
            Some(io) => io.clone(),
            None => return Ok(Vec::new()),
        };

        // walk /First then /Next, collecting top-level siblings
        let mut list = Vec::new();
        let mut visited = HashSet::new();
        let mut node = {
            let inner = outlines_root.object.borrow();
            match inner.as_dict().and_then(|dict| dict.get("First")) {
                Some(PdfObject::Indirect(io)) => Some(io.clone()),
                _ => None,
            }
        };
        while let Some(current) = node {
            if !visited.insert(Rc::as_ptr(&current) as usize) {
                error!("circular outline reference");
                return Err(PdfError::CircularOutline);
            }
            let inner = current.object.borrow();
            let dict = match inner.as_dict() {
                Some(dict) => dict,
                None => {
                    debug!("outline node is not a dictionary, stopping walk");
                    break;
                }
            };
            let next = match dict.get("Next") {
                Some(PdfObject::Indirect(io)) => Some(io.clone()),
                _ => None,
            };
            drop(inner);
            list.push(current);
            node = next;
        }
        Ok(list)
    }

    // --- forms -------------------------------------------------------------

    fn load_forms(&mut self) -> Result<Option<Dictionary>> {
        let slot = {
            let catalog = self.catalog()?;
            let inner = catalog.object.borrow();
            match inner.as_dict().and_then(|dict| dict.get("AcroForm")) {
                Some(slot) => slot.clone(),
                None => return Ok(None),
            }
        };

        match slot {
            PdfObject::Dictionary(_) => {
                // direct dictionary: resolve in place, store the resolved
                // value back so later reads see handles instead of refs
                let mut value = slot;
                self.traverse_value(&mut value, &["Parent"])?;
                let dict = value.as_dict().cloned();
                let catalog = self.catalog()?.clone();
                if let Some(d) = catalog.object.borrow_mut().as_dict_mut() {
                    d.set("AcroForm", value);
                }
                Ok(dict)
            }
            PdfObject::Reference(_) | PdfObject::Indirect(_) => {
                let resolved = self.parser.trace(&slot)?;
                self.traverse(&resolved, &["Parent"])?;
                match resolved.as_indirect() {
                    Some(io) => Ok(io.object.borrow().as_dict().cloned()),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    // --- page tree ---------------------------------------------------------

    /// Depth-first preorder flattening. Fixes `/Parent` on every node,
    /// resolves `/Kids` slots to handles and appends leaves to the page
    /// list in visit order.
    fn build_page_tree(
        &mut self,
        node: &Rc<IndirectObject>,
        parent: Option<&Rc<IndirectObject>>,
    ) -> Result<()> {
        let node_type = {
            let mut inner = node.object.borrow_mut();
            let dict = inner
                .as_dict_mut()
                .ok_or_else(|| PdfError::InvalidPageNode("node is not a dictionary".to_string()))?;
            let node_type = dict
                .get("Type")
                .and_then(|obj| obj.as_name())
                .map(|name| name.as_str().to_string())
                .ok_or_else(|| PdfError::InvalidPageNode("node missing /Type".to_string()))?;
            // set the parent in case it is missing or incorrect
            if let Some(parent) = parent {
                dict.set("Parent", PdfObject::Indirect(parent.clone()));
            }
            node_type
        };

        match node_type.as_str() {
            "Page" => {
                self.page_list.push(node.clone());
                return Ok(());
            }
            "Pages" => {}
            other => {
                error!("page tree contains a /{other} node");
                return Err(PdfError::InvalidPageNode(format!(
                    "expected Page or Pages, found {other}"
                )));
            }
        }

        // resolve the interior node's attributes without recursing up the
        // tree or into the children twice
        self.traverse(&PdfObject::Indirect(node.clone()), &["Parent", "Kids"])?;

        // /Kids is a direct array or an indirect object wrapping one
        let kids_slot = {
            let inner = node.object.borrow();
            inner
                .as_dict()
                .and_then(|dict| dict.get("Kids"))
                .cloned()
                .ok_or_else(|| PdfError::InvalidPageNode("Pages node missing /Kids".to_string()))?
        };
        let kids_holder = match kids_slot {
            PdfObject::Reference(id) => {
                let resolved = self.parser.lookup_by_reference(id)?;
                let holder = resolved.as_indirect().cloned().ok_or_else(|| {
                    PdfError::InvalidPageNode("/Kids reference is not an object".to_string())
                })?;
                if let Some(dict) = node.object.borrow_mut().as_dict_mut() {
                    dict.set("Kids", PdfObject::Indirect(holder.clone()));
                }
                Some(holder)
            }
            PdfObject::Indirect(io) => Some(io),
            PdfObject::Array(_) => None,
            _ => {
                return Err(PdfError::InvalidPageNode("invalid /Kids object".to_string()));
            }
        };

        let mut kid_slots = match &kids_holder {
            Some(holder) => holder
                .object
                .borrow()
                .as_array()
                .cloned()
                .ok_or_else(|| PdfError::InvalidPageNode("indirect /Kids is not an array".to_string()))?,
            None => {
                let inner = node.object.borrow();
                inner
                    .as_dict()
                    .and_then(|dict| dict.get("Kids"))
                    .and_then(|obj| obj.as_array())
                    .cloned()
                    .ok_or_else(|| PdfError::InvalidPageNode("invalid /Kids array".to_string()))?
            }
        };

        let mut children = Vec::with_capacity(kid_slots.len());
        for slot in kid_slots.iter_mut() {
            if let PdfObject::Reference(id) = slot {
                let resolved = self.parser.lookup_by_reference(*id)?;
                *slot = resolved;
            }
            match slot {
                PdfObject::Indirect(io) => children.push(io.clone()),
                _ => {
                    error!("page tree kid is not an indirect object");
                    return Err(PdfError::InvalidPageNode(
                        "kid is not an indirect object".to_string(),
                    ));
                }
            }
        }

        // write the resolved slots back so later walks see no references
        match &kids_holder {
            Some(holder) => {
                *holder.object.borrow_mut() = PdfObject::Array(kid_slots);
            }
            None => {
                if let Some(dict) = node.object.borrow_mut().as_dict_mut() {
                    dict.set("Kids", PdfObject::Array(kid_slots));
                }
            }
        }

        for child in &children {
            self.build_page_tree(child, Some(node))?;
        }
        Ok(())
    }

    // --- traversal ---------------------------------------------------------

    /// Cycle-safe walk from `root`, replacing reference slots with
    /// resolved handles. Dictionary keys named in `nofollow` are neither
    /// resolved nor recursed. The visited set persists for the reader's
    /// lifetime, so each node is processed once ever.
    fn traverse(&mut self, root: &PdfObject, nofollow: &[&str]) -> Result<()> {
        match root {
            PdfObject::Indirect(io) => {
                if !self.traversed.insert(Rc::as_ptr(io) as usize) {
                    return Ok(());
                }
                let mut inner = io.object.borrow_mut();
                self.traverse_value(&mut inner, nofollow)
            }
            PdfObject::Stream(stream) => {
                if !self.traversed.insert(Rc::as_ptr(stream) as usize) {
                    return Ok(());
                }
                let mut dict = stream.dict.borrow_mut();
                self.traverse_dict(&mut dict, nofollow)
            }
            PdfObject::Reference(id) => {
                error!("traversal reached a bare reference {id}");
                Err(PdfError::BadReference(format!(
                    "unresolved reference {id} at traversal root"
                )))
            }
            _ => Ok(()),
        }
    }

    fn traverse_value(&mut self, value: &mut PdfObject, nofollow: &[&str]) -> Result<()> {
        match value {
            PdfObject::Dictionary(dict) => self.traverse_dict(dict, nofollow),
            PdfObject::Array(items) => {
                for slot in items.iter_mut() {
                    self.traverse_slot(slot, nofollow)?;
                }
                Ok(())
            }
            PdfObject::Indirect(_) | PdfObject::Stream(_) => {
                let handle = value.clone();
                self.traverse(&handle, nofollow)
            }
            PdfObject::Reference(id) => Err(PdfError::BadReference(format!(
                "unresolved reference {id} at traversal root"
            ))),
            _ => Ok(()),
        }
    }

    fn traverse_dict(&mut self, dict: &mut Dictionary, nofollow: &[&str]) -> Result<()> {
        for (key, slot) in dict.iter_mut() {
            if nofollow.contains(&key.as_str()) {
                continue;
            }
            self.traverse_slot(slot, nofollow)?;
        }
        Ok(())
    }

    /// Resolve one container slot and recurse into the result.
    fn traverse_slot(&mut self, slot: &mut PdfObject, nofollow: &[&str]) -> Result<()> {
        if let PdfObject::Reference(id) = slot {
            let resolved = self.parser.lookup_by_reference(*id)?;
            *slot = resolved;
        }
        match slot {
            PdfObject::Indirect(_) | PdfObject::Stream(_) => {
                let handle = slot.clone();
                self.traverse(&handle, nofollow)
            }
            PdfObject::Dictionary(_) | PdfObject::Array(_) => self.traverse_value(slot, nofollow),
            _ => Ok(()),
        }
    }
}

fn destination_matches(dest: Option<&PdfObject>, target: &PdfObject) -> bool {
    dest.and_then(|obj| obj.as_array())
        .and_then(|array| array.first())
        .map(|first| first.is_same_node(target))
        .unwrap_or(false)
}
