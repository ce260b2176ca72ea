//! Inventory file codec.
//!
//! Reads and writes the `objects.inv` format Sphinx builds publish so that
//! other projects can link into them. Two versions exist:
//!
//! - version 1: plain text, Python objects only, no anchors
//! - version 2: four header lines followed by a zlib stream of
//!   `name domain:type priority location dispname` lines
pub mod item_set;
pub mod reader;

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

pub use item_set::{InventoryItemSet, NO_DISPLAY_NAME};
pub use reader::InventoryReader;

lazy_static! {
    /// Version 2 entry line. Names may contain spaces, hence the lazy first group.
    static ref ENTRY_REGEX: Regex =
        Regex::new(r"^(.+?)\s+(\S+)\s+(-?\d+)\s+?(\S*)\s+(.*)$").unwrap();

    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

const HEADER_V1: &str = "# Sphinx inventory version 1";
const HEADER_V2: &str = "# Sphinx inventory version 2";

/// Length of the `# Project: ` / `# Version: ` prefixes.
const HEADER_PREFIX_LEN: usize = 11;

/// Location of one documented object in one documentation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub project_name: String,
    pub project_version: String,
    pub uri: String,
    pub display_name: String,
}

/// `"{domain}:{objtype}"` -> object name -> item.
pub type Inventory = HashMap<String, HashMap<String, InventoryItem>>;

/// Joins a base URI with an inventory location.
pub type JoinFn = fn(&str, &str) -> String;

/// Filesystem join, for inventories whose base URI is a local path.
pub fn local_join(base: &str, location: &str) -> String {
    Path::new(base).join(location).to_string_lossy().into_owned()
}

/// POSIX path join, for remote base URIs.
pub fn posix_join(base: &str, location: &str) -> String {
    if location.starts_with('/') || base.is_empty() {
        location.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, location)
    } else {
        format!("{}/{}", base, location)
    }
}

/// An object a build documents, as written into its own inventory.
///
/// Field order gives the natural ordering used when dumping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentedObject {
    pub name: String,
    pub display_name: String,
    pub objtype: String,
    pub docname: String,
    pub anchor: String,
    pub priority: i32,
}

pub struct InventoryFile;

impl InventoryFile {
    /// Parse an inventory from `stream`, joining each location onto `uri`.
    pub fn load<R: Read>(stream: R, uri: &str, join: JoinFn) -> Result<Inventory, InventoryError> {
        let mut reader = InventoryReader::new(stream);
        let line = reader.readline()?;
        match line.trim_end() {
            HEADER_V1 => Self::load_v1(reader, uri, join),
            HEADER_V2 => Self::load_v2(reader, uri, join),
            other => Err(InventoryError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Parse a local inventory file. Locations are joined with `local_join`.
    pub fn load_path(path: &Path, uri: &str) -> Result<Inventory, InventoryError> {
        let file = File::open(path)?;
        Self::load(file, uri, local_join)
    }

    fn read_project_header<R: Read>(
        reader: &mut InventoryReader<R>,
    ) -> Result<(String, String), InventoryError> {
        let project = reader.readline()?;
        let version = reader.readline()?;
        let value = |line: &str| {
            line.trim_end()
                .get(HEADER_PREFIX_LEN..)
                .unwrap_or_default()
                .to_string()
        };
        Ok((value(&project), value(&version)))
    }

    fn load_v1<R: Read>(
        mut reader: InventoryReader<R>,
        uri: &str,
        join: JoinFn,
    ) -> Result<Inventory, InventoryError> {
        let (project, version) = Self::read_project_header(&mut reader)?;
        let mut inventory = Inventory::new();

        for line in reader.readlines() {
            let line = line?;
            let Some((name, objtype, location)) = split_v1_line(&line) else {
                return Err(InventoryError::MalformedLine(line.clone()));
            };

            // version 1 did not add anchors to the location
            let mut location = join(uri, location);
            let objtype = if objtype == "mod" {
                location.push_str("#module-");
                location.push_str(name);
                "py:module".to_string()
            } else {
                location.push('#');
                location.push_str(name);
                format!("py:{}", objtype)
            };

            insert_item(
                &mut inventory,
                objtype,
                name,
                InventoryItem {
                    project_name: project.clone(),
                    project_version: version.clone(),
                    uri: location,
                    display_name: NO_DISPLAY_NAME.to_string(),
                },
            );
        }

        Ok(inventory)
    }

    fn load_v2<R: Read>(
        mut reader: InventoryReader<R>,
        uri: &str,
        join: JoinFn,
    ) -> Result<Inventory, InventoryError> {
        let (project, version) = Self::read_project_header(&mut reader)?;
        let line = reader.readline()?;
        if !line.contains("zlib") {
            return Err(InventoryError::NotCompressed(line));
        }

        let mut inventory = Inventory::new();
        for line in reader.into_compressed_lines() {
            let line = line?;
            let Some(caps) = ENTRY_REGEX.captures(line.trim_end()) else {
                continue;
            };
            let (name, objtype, location, display_name) =
                (&caps[1], &caps[2], &caps[4], &caps[5]);
            if !objtype.contains(':') {
                // the type must be "{domain}:{objtype}"
                debug!("skipping inventory line with untyped object: {}", line);
                continue;
            }
            let location = match location.strip_suffix('$') {
                Some(prefix) => format!("{}{}", prefix, name),
                None => location.to_string(),
            };

            insert_item(
                &mut inventory,
                objtype.to_string(),
                name,
                InventoryItem {
                    project_name: project.clone(),
                    project_version: version.clone(),
                    uri: join(uri, &location),
                    display_name: display_name.to_string(),
                },
            );
        }

        Ok(inventory)
    }

    /// Write a version 2 inventory.
    ///
    /// `objects` maps domain names to the objects they document;
    /// `target_uri` turns a docname into the URI of its built page.
    pub fn dump<W, F>(
        mut writer: W,
        project: &str,
        version: &str,
        objects: &BTreeMap<String, Vec<DocumentedObject>>,
        target_uri: F,
    ) -> Result<W, InventoryError>
    where
        W: Write,
        F: Fn(&str) -> String,
    {
        let escape = |s: &str| WHITESPACE_REGEX.replace_all(s, " ").into_owned();
        write!(
            writer,
            "{}\n# Project: {}\n# Version: {}\n# The remainder of this file is compressed using zlib.\n",
            HEADER_V2,
            escape(project),
            escape(version)
        )?;

        let mut encoder = ZlibEncoder::new(writer, Compression::best());
        for (domain_name, domain_objects) in objects {
            let mut sorted: Vec<&DocumentedObject> = domain_objects.iter().collect();
            sorted.sort();
            for object in sorted {
                let anchor = match object.anchor.strip_suffix(object.name.as_str()) {
                    // this can shorten the inventory by as much as 25%
                    Some(prefix) if !object.name.is_empty() => format!("{}$", prefix),
                    _ => object.anchor.clone(),
                };
                let mut uri = target_uri(&object.docname);
                if !anchor.is_empty() {
                    uri.push('#');
                    uri.push_str(&anchor);
                }
                let display_name = if object.display_name == object.name {
                    NO_DISPLAY_NAME
                } else {
                    object.display_name.as_str()
                };
                writeln!(
                    encoder,
                    "{} {}:{} {} {} {}",
                    object.name, domain_name, object.objtype, object.priority, uri, display_name
                )?;
            }
        }
        Ok(encoder.finish()?)
    }

    /// `dump` into an in-memory buffer.
    pub fn dump_to_vec<F>(
        project: &str,
        version: &str,
        objects: &BTreeMap<String, Vec<DocumentedObject>>,
        target_uri: F,
    ) -> Result<Vec<u8>, InventoryError>
    where
        F: Fn(&str) -> String,
    {
        Self::dump(Vec::new(), project, version, objects, target_uri)
    }
}

/// `name type location`, fields separated by runs of whitespace.
fn split_v1_line(line: &str) -> Option<(&str, &str, &str)> {
    let (name, rest) = line.trim().split_once(char::is_whitespace)?;
    let (objtype, location) = rest.trim_start().split_once(char::is_whitespace)?;
    Some((name, objtype, location.trim_start()))
}

fn insert_item(inventory: &mut Inventory, objtype: String, name: &str, item: InventoryItem) {
    let objects = inventory.entry(objtype.clone()).or_default();
    if objtype == "py:module" && objects.contains_key(name) {
        // Sphinx 1.1 and below wrote two entries per module; the first is correct
        return;
    }
    objects.insert(name.to_string(), item);
}

/// Human-readable listing of an inventory, sorted by type and name.
pub fn format_inventory(inventory: &Inventory) -> String {
    let mut out = String::new();
    let mut types: Vec<&String> = inventory.keys().collect();
    types.sort();
    for objtype in types {
        out.push_str(objtype);
        out.push('\n');
        let mut entries: Vec<(&String, &InventoryItem)> = inventory[objtype].iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (name, item) in entries {
            let display = if item.display_name == NO_DISPLAY_NAME {
                String::new()
            } else {
                format!("{:<40}: ", item.display_name)
            };
            out.push_str(&format!("\t{:<40} {}{}\n", name, display, item.uri));
        }
    }
    out
}
