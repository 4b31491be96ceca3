//! Streaming manifest parser
//!
//! Walks the XML element stream of a side-by-side manifest and registers an
//! activatable-class provider for every `<activatableClass>` declaration
//! found inside a `<file>` block. Unknown elements and attributes are
//! ignored; element and attribute names match case-insensitively.
//!
//! Registration is append-only: a failure partway through a document leaves
//! classes from preceding valid elements registered. There is no rollback.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::catalog::ComponentCatalog;
use crate::error::ActivationError;
use crate::provider::{Provider, ThreadingModel};
use crate::Result;

/// Parse a manifest document and populate `catalog`.
///
/// Returns the number of classes registered. A malformed document, or a
/// class identifier already present in the catalog, aborts the load with the
/// corresponding typed error.
pub fn parse_manifest(xml: &str, catalog: &ComponentCatalog) -> Result<usize> {
    let mut reader = Reader::from_str(xml);
    let mut registered = 0usize;
    loop {
        match reader.read_event() {
            Err(err) => return Err(xml_error(err)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(el)) if is_element(&el, b"file") => {
                registered += parse_file_block(&mut reader, &el, catalog)?;
            }
            Ok(Event::Empty(el)) if is_element(&el, b"file") => {
                // A childless <file/> still needs a valid name.
                file_name_attribute(&el)?;
            }
            Ok(_) => {}
        }
    }
    tracing::debug!(registered, "manifest parsed");
    Ok(registered)
}

/// Parse one `<file>` block up to its matching end element.
///
/// A class declared after this block's end element belongs to the next
/// `<file>`, never to this one; a nested `<file>` opens its own scope.
fn parse_file_block(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    catalog: &ComponentCatalog,
) -> Result<usize> {
    let file_name = file_name_attribute(start)?;
    let mut registered = 0usize;
    loop {
        match reader.read_event() {
            Err(err) => return Err(xml_error(err)),
            Ok(Event::Eof) => {
                return Err(ActivationError::malformed(format!(
                    "unclosed <file> element for '{}'",
                    file_name
                )))
            }
            Ok(Event::Start(el)) if is_element(&el, b"file") => {
                registered += parse_file_block(reader, &el, catalog)?;
            }
            Ok(Event::Start(ref el)) | Ok(Event::Empty(ref el))
                if is_element(el, b"activatableClass") =>
            {
                register_activatable_class(el, &file_name, catalog)?;
                registered += 1;
            }
            Ok(Event::End(el)) if el.local_name().as_ref().eq_ignore_ascii_case(b"file") => {
                return Ok(registered);
            }
            Ok(_) => {}
        }
    }
}

/// Read the attributes of one `<activatableClass>` element and register the
/// declared class.
fn register_activatable_class(
    element: &BytesStart<'_>,
    file_name: &str,
    catalog: &ComponentCatalog,
) -> Result<()> {
    let mut class_name: Option<String> = None;
    let mut threading_model: Option<String> = None;
    let mut xmlns: Option<String> = None;

    // One linear pass over the attribute list; by-name lookups rescan it for
    // every attribute.
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|err| {
            ActivationError::malformed(format!("bad attribute in <activatableClass>: {}", err))
        })?;
        let value = attribute.unescape_value().map_err(xml_error)?;
        let key = attribute.key.local_name();
        if key.as_ref().eq_ignore_ascii_case(b"name") {
            class_name = Some(value.into_owned());
        } else if key.as_ref().eq_ignore_ascii_case(b"threadingModel") {
            threading_model = Some(value.into_owned());
        } else if key.as_ref().eq_ignore_ascii_case(b"xmlns") {
            xmlns = Some(value.into_owned());
        }
    }

    let threading_model = match threading_model {
        Some(value) => ThreadingModel::parse(&value).ok_or_else(|| {
            ActivationError::malformed(format!("unrecognized threading model '{}'", value))
                .with_hint("expected one of 'sta', 'mta' or 'both'")
        })?,
        None => {
            return Err(ActivationError::malformed(format!(
                "<activatableClass> in file '{}' is missing the 'threadingModel' attribute",
                file_name
            )))
        }
    };

    let class_name = match class_name {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(ActivationError::malformed(format!(
                "<activatableClass> in file '{}' is missing a non-empty 'name' attribute",
                file_name
            )))
        }
    };

    let provider = Arc::new(Provider::new(file_name, xmlns, threading_model));
    catalog.insert(&class_name, provider)
}

/// The mandatory, non-empty `name` attribute of a `<file>` element.
fn file_name_attribute(element: &BytesStart<'_>) -> Result<String> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|err| {
            ActivationError::malformed(format!("bad attribute in <file>: {}", err))
        })?;
        if attribute.key.local_name().as_ref().eq_ignore_ascii_case(b"name") {
            let value = attribute.unescape_value().map_err(xml_error)?;
            if value.is_empty() {
                break;
            }
            return Ok(value.into_owned());
        }
    }
    Err(
        ActivationError::malformed("<file> element is missing a non-empty 'name' attribute")
            .with_hint("every <file> must name the module its classes live in"),
    )
}

fn is_element(element: &BytesStart<'_>, name: &[u8]) -> bool {
    element.local_name().as_ref().eq_ignore_ascii_case(name)
}

fn xml_error(err: quick_xml::Error) -> ActivationError {
    ActivationError::malformed(format!("xml parse error: {}", err))
}
