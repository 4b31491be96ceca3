//! Embedded manifest extraction from native binaries
//!
//! Locates the manifest resource inside a PE image mapped as plain data:
//! resource directory walk down type / id / language, probing manifest
//! resource id 1 and then id 2. Returns the raw byte range of the resource;
//! the caller parses it as UTF-8 XML.

use crate::error::ActivationError;
use crate::Result;

/// Resource type id of manifest resources.
const RT_MANIFEST: u32 = 24;

/// Resource ids probed for the embedded manifest, in order.
const MANIFEST_RESOURCE_IDS: [u32; 2] = [1, 2];

const SUBDIRECTORY_BIT: u32 = 0x8000_0000;

/// Find the embedded manifest resource inside a PE image.
pub fn find_manifest_resource(image: &[u8]) -> Result<&[u8]> {
    let pe = PeImage::parse(image)?;
    let type_dir = pe
        .find_id_entry(0, RT_MANIFEST)?
        .and_then(subdirectory_offset)
        .ok_or_else(|| no_manifest_error())?;

    for resource_id in MANIFEST_RESOURCE_IDS {
        let Some(name_entry) = pe.find_id_entry(type_dir, resource_id)? else {
            continue;
        };
        let Some(language_dir) = subdirectory_offset(name_entry) else {
            continue;
        };
        // Any language variant will do; take the first entry.
        let Some(leaf) = pe.first_entry(language_dir)? else {
            continue;
        };
        if leaf & SUBDIRECTORY_BIT != 0 {
            continue;
        }
        return pe.data_entry(leaf as usize);
    }
    Err(no_manifest_error())
}

fn no_manifest_error() -> ActivationError {
    ActivationError::malformed("no embedded manifest resource at id 1 or 2")
        .with_hint("the binary must carry a manifest-type resource to be loadable this way")
}

fn subdirectory_offset(entry: u32) -> Option<usize> {
    (entry & SUBDIRECTORY_BIT != 0).then_some((entry & !SUBDIRECTORY_BIT) as usize)
}

/// Just enough PE surface to reach the resource directory.
struct PeImage<'a> {
    image: &'a [u8],
    /// File offset of the resource section's directory tree.
    resource_base: usize,
    /// File offset of the section table and number of sections, for
    /// RVA-to-offset translation.
    section_table: usize,
    section_count: usize,
}

impl<'a> PeImage<'a> {
    fn parse(image: &'a [u8]) -> Result<Self> {
        if read_u16(image, 0)? != 0x5A4D {
            return Err(truncated("not a PE image (missing MZ signature)"));
        }
        let e_lfanew = read_u32(image, 0x3C)? as usize;
        if read_u32(image, e_lfanew)? != 0x0000_4550 {
            return Err(truncated("missing PE signature"));
        }

        let coff = e_lfanew + 4;
        let section_count = read_u16(image, coff + 2)? as usize;
        let optional_size = read_u16(image, coff + 16)? as usize;
        let optional = coff + 20;

        // Data-directory layout differs between PE32 and PE32+.
        let (directory_count_offset, directories_offset) = match read_u16(image, optional)? {
            0x10B => (92, 96),
            0x20B => (108, 112),
            magic => {
                return Err(truncated(format!(
                    "unrecognized optional-header magic {:#x}",
                    magic
                )))
            }
        };

        let directory_count = read_u32(image, optional + directory_count_offset)? as usize;
        if directory_count <= 2 {
            return Err(no_manifest_error());
        }
        // Resource directory is data-directory entry 2.
        let resource_rva = read_u32(image, optional + directories_offset + 2 * 8)? as usize;
        if resource_rva == 0 {
            return Err(no_manifest_error());
        }

        let section_table = optional + optional_size;
        let mut pe = Self {
            image,
            resource_base: 0,
            section_table,
            section_count,
        };
        pe.resource_base = pe.rva_to_offset(resource_rva)?;
        Ok(pe)
    }

    fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        for index in 0..self.section_count {
            let header = self.section_table + index * 40;
            let virtual_size = read_u32(self.image, header + 8)? as usize;
            let virtual_address = read_u32(self.image, header + 12)? as usize;
            let raw_size = read_u32(self.image, header + 16)? as usize;
            let raw_pointer = read_u32(self.image, header + 20)? as usize;
            let span = virtual_size.max(raw_size);
            if rva >= virtual_address && rva < virtual_address + span {
                return Ok(raw_pointer + (rva - virtual_address));
            }
        }
        Err(truncated("resource rva outside every section"))
    }

    /// Find the offset field of the id entry matching `id` in the resource
    /// directory at `directory` (relative to the resource base). Named
    /// entries precede id entries and are skipped.
    fn find_id_entry(&self, directory: usize, id: u32) -> Result<Option<u32>> {
        let base = self.resource_base + directory;
        let named = read_u16(self.image, base + 12)? as usize;
        let ids = read_u16(self.image, base + 14)? as usize;
        for index in named..named + ids {
            let entry = base + 16 + index * 8;
            if read_u32(self.image, entry)? == id {
                return Ok(Some(read_u32(self.image, entry + 4)?));
            }
        }
        Ok(None)
    }

    /// The offset field of the first entry of the directory at `directory`.
    fn first_entry(&self, directory: usize) -> Result<Option<u32>> {
        let base = self.resource_base + directory;
        let named = read_u16(self.image, base + 12)? as usize;
        let ids = read_u16(self.image, base + 14)? as usize;
        if named + ids == 0 {
            return Ok(None);
        }
        Ok(Some(read_u32(self.image, base + 16 + 4)?))
    }

    /// Extract the byte range described by the data entry at `entry`
    /// (relative to the resource base).
    fn data_entry(&self, entry: usize) -> Result<&'a [u8]> {
        let base = self.resource_base + entry;
        let data_rva = read_u32(self.image, base)? as usize;
        let size = read_u32(self.image, base + 4)? as usize;
        let offset = self.rva_to_offset(data_rva)?;
        self.image
            .get(offset..offset + size)
            .ok_or_else(|| truncated("resource data extends past end of image"))
    }
}

fn truncated(reason: impl Into<String>) -> ActivationError {
    ActivationError::malformed(format!("embedded manifest: {}", reason.into()))
}

fn read_u16(image: &[u8], offset: usize) -> Result<u16> {
    image
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| truncated("image too small"))
}

fn read_u32(image: &[u8], offset: usize) -> Result<u32> {
    image
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| truncated("image too small"))
}
