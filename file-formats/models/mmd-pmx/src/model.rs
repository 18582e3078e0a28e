use std::fs;
use std::io::Write;
use std::path::Path;

use mmd_data::io_ext::WriteExt;
use mmd_data::{BinaryReader, IndexDomain, IndexWidth};

use crate::bone::Bone;
use crate::error::Result;
use crate::header::PmxHeader;
use crate::joint::{Joint, MAX_JOINTS};
use crate::material::Material;
use crate::morph::{skip_display_frames, skip_morphs};
use crate::rigidbody::{MAX_RIGIDBODIES, Rigidbody};
use crate::skeleton::Skeleton;
use crate::vertex::{SkinWeights, Vertex};

pub const MAX_VERTICES: usize = 16_777_216;
pub const MAX_FACE_INDICES: usize = 3 * MAX_VERTICES;
pub const MAX_TEXTURES: usize = 65_536;
pub const MAX_MATERIALS: usize = 65_536;
pub const MAX_BONES: usize = 65_536;

/// A parsed PMX model
///
/// Immutable once loaded. Morphs and display frames are not kept; only
/// their counts are recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PmxModel {
    pub header: PmxHeader,
    pub vertices: Vec<Vertex>,
    /// Triangle list, three vertex indices per face.
    pub indices: Vec<u32>,
    pub textures: Vec<String>,
    pub materials: Vec<Material>,
    pub skeleton: Skeleton,
    pub morph_count: usize,
    pub display_frame_count: usize,
    pub rigidbodies: Vec<Rigidbody>,
    pub joints: Vec<Joint>,
}

impl PmxModel {
    /// Parse a PMX model from an in-memory buffer
    ///
    /// Header, geometry, material and bone sections are required and any
    /// error in them is returned. Morphs and display frames are only
    /// skipped; if that fails the model is still returned, without
    /// rigidbodies or joints. A bad rigidbody or joint record ends its
    /// section but keeps the records before it.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mmd_pmx::PmxModel;
    ///
    /// let data = std::fs::read("model.pmx").unwrap();
    /// let model = PmxModel::parse(&data).unwrap();
    /// println!("{} bones", model.skeleton.len());
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let header = PmxHeader::parse(&mut reader)?;
        let widths = header.index_widths;

        let count = reader.read_i32()?;
        let count = reader.checked_count(count, Vertex::min_size(&header), MAX_VERTICES, "vertex")?;
        let mut vertices = Vec::with_capacity(count);
        for _ in 0..count {
            vertices.push(Vertex::parse(&mut reader, &header)?);
        }

        let count = reader.read_i32()?;
        let vertex_width = widths.get(IndexDomain::Vertex);
        let count = reader.checked_count(count, vertex_width.size(), MAX_FACE_INDICES, "face index")?;
        if count % 3 != 0 {
            log::warn!("Face index count {} is not a multiple of three", count);
        }
        let mut indices = Vec::with_capacity(count);
        for _ in 0..count {
            indices.push(reader.read_unsigned_index(vertex_width)? as u32);
        }

        let count = reader.read_i32()?;
        let count = reader.checked_count(count, 4, MAX_TEXTURES, "texture")?;
        let mut textures = Vec::with_capacity(count);
        for _ in 0..count {
            textures.push(reader.read_text(header.encoding)?);
        }

        let count = reader.read_i32()?;
        let count = reader.checked_count(count, 64, MAX_MATERIALS, "material")?;
        let mut materials = Vec::with_capacity(count);
        for _ in 0..count {
            materials.push(Material::parse(&mut reader, &header)?);
        }

        let count = reader.read_i32()?;
        let count = reader.checked_count(count, 24, MAX_BONES, "bone")?;
        let mut bones = Vec::with_capacity(count);
        for _ in 0..count {
            bones.push(Bone::parse(&mut reader, &header)?);
        }
        let skeleton = Skeleton::new(bones)?;

        log::debug!(
            "Parsed {} vertices, {} faces, {} materials, {} bones",
            vertices.len(),
            indices.len() / 3,
            materials.len(),
            skeleton.len()
        );

        let mut model = Self {
            header,
            vertices,
            indices,
            textures,
            materials,
            skeleton,
            ..Default::default()
        };
        model.normalize_weights();
        model.parse_trailing_sections(&mut reader);
        Ok(model)
    }

    fn parse_trailing_sections(&mut self, reader: &mut BinaryReader<'_>) {
        let skipped = skip_morphs(reader, &self.header).and_then(|morphs| {
            skip_display_frames(reader, &self.header).map(|frames| (morphs, frames))
        });
        match skipped {
            Ok((morphs, frames)) => {
                self.morph_count = morphs;
                self.display_frame_count = frames;
            }
            Err(e) => {
                log::warn!("Could not skip morph/display sections, physics data dropped: {}", e);
                return;
            }
        }

        let (rigidbodies, complete) = read_records(
            reader,
            &self.header,
            "rigidbody",
            MAX_RIGIDBODIES,
            Rigidbody::parse,
        );
        self.rigidbodies = rigidbodies;
        if !complete {
            return;
        }

        let (joints, _) = read_records(reader, &self.header, "joint", MAX_JOINTS, Joint::parse);
        self.joints = joints;
    }

    /// Load a PMX model from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::parse(&data)
    }

    /// Save a PMX model to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut data = Vec::new();
        self.write(&mut data)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Write the model in PMX layout
    ///
    /// Morph and display frame sections are written empty. The header's
    /// encoding and index widths are used as they are; call
    /// [`PmxModel::fit_index_widths`] first if element counts changed.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let header = &self.header;
        header.write(writer)?;

        writer.write_i32_le(self.vertices.len() as i32)?;
        for vertex in &self.vertices {
            vertex.write(writer, header)?;
        }

        let vertex_width = header.index_widths.get(IndexDomain::Vertex);
        writer.write_i32_le(self.indices.len() as i32)?;
        for &index in &self.indices {
            writer.write_unsigned_index(vertex_width, index as usize)?;
        }

        writer.write_i32_le(self.textures.len() as i32)?;
        for texture in &self.textures {
            writer.write_text(header.encoding, texture)?;
        }

        writer.write_i32_le(self.materials.len() as i32)?;
        for material in &self.materials {
            material.write(writer, header)?;
        }

        writer.write_i32_le(self.skeleton.len() as i32)?;
        for bone in self.skeleton.bones() {
            bone.write(writer, header)?;
        }

        // morphs, display frames
        writer.write_i32_le(0)?;
        writer.write_i32_le(0)?;

        writer.write_i32_le(self.rigidbodies.len() as i32)?;
        for rigidbody in &self.rigidbodies {
            rigidbody.write(writer, header)?;
        }

        writer.write_i32_le(self.joints.len() as i32)?;
        for joint in &self.joints {
            joint.write(writer, header)?;
        }
        Ok(())
    }

    /// Shrink every index width to the smallest that fits the model.
    pub fn fit_index_widths(&mut self) {
        let widths = &mut self.header.index_widths;
        widths.set(
            IndexDomain::Vertex,
            IndexWidth::for_vertex_count(self.vertices.len()),
        );
        widths.set(
            IndexDomain::Texture,
            IndexWidth::for_signed_count(self.textures.len()),
        );
        widths.set(
            IndexDomain::Material,
            IndexWidth::for_signed_count(self.materials.len()),
        );
        widths.set(
            IndexDomain::Bone,
            IndexWidth::for_signed_count(self.skeleton.len()),
        );
        widths.set(
            IndexDomain::Morph,
            IndexWidth::for_signed_count(self.morph_count),
        );
        widths.set(
            IndexDomain::Rigidbody,
            IndexWidth::for_signed_count(self.rigidbodies.len()),
        );
    }

    /// Recompute every vertex's fixed-point weights against the skeleton.
    pub fn normalize_weights(&mut self) {
        let bone_count = self.skeleton.len();
        for vertex in &mut self.vertices {
            vertex.weights = SkinWeights::normalize(vertex.deform.influences(), bone_count);
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Read a counted list of records, stopping at the first bad record.
///
/// Returns the records read and whether the whole section was consumed.
fn read_records<T>(
    reader: &mut BinaryReader<'_>,
    header: &PmxHeader,
    what: &'static str,
    limit: usize,
    parse: fn(&mut BinaryReader<'_>, &PmxHeader) -> Result<T>,
) -> (Vec<T>, bool) {
    if reader.is_empty() {
        log::debug!("No {} section", what);
        return (Vec::new(), false);
    }

    let count = match reader
        .read_i32()
        .and_then(|raw| reader.checked_count(raw, 1, limit, what))
    {
        Ok(count) => count,
        Err(e) => {
            log::warn!("Bad {} count: {}", what, e);
            return (Vec::new(), false);
        }
    };

    let mut records = Vec::with_capacity(count);
    for index in 0..count {
        match parse(reader, header) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!(
                    "Stopping at {} {} of {}: {}",
                    what,
                    index,
                    count,
                    e
                );
                return (records, false);
            }
        }
    }
    log::debug!("Parsed {} {} records", records.len(), what);
    (records, true)
}
