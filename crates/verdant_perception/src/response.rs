//! Perception response payloads and their wire form.
//!
//! A [`QueryResponse`] is a tagged union announced by a `u64` mask header
//! whose single set bit names the payload shape, mirroring the component
//! mask convention. Decoders reject masks with unknown or multiple bits
//! before touching the payload.

use std::collections::BTreeMap;

use verdant_core::{CodecError, EntityInterface, WireReader, WireWriter};
use verdant_grid::GridView;

/// One query result on a response channel.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    /// Flat list of strings.
    ListString(Vec<String>),
    /// String-keyed map of string-keyed maps.
    MapOfMaps(BTreeMap<String, BTreeMap<String, String>>),
    /// Flat list of doubles.
    ListDouble(Vec<f64>),
    /// String-keyed lists of doubles.
    MapOfListsDouble(BTreeMap<String, Vec<f64>>),
    /// String-keyed map of string-keyed doubles.
    MapOfMapsDouble(BTreeMap<String, BTreeMap<String, f64>>),
}

impl QueryResponse {
    /// Bit index of this shape in the mask header.
    #[must_use]
    const fn tag(&self) -> u32 {
        match self {
            Self::ListString(_) => 0,
            Self::MapOfMaps(_) => 1,
            Self::ListDouble(_) => 2,
            Self::MapOfListsDouble(_) => 3,
            Self::MapOfMapsDouble(_) => 4,
        }
    }

    /// Encodes the mask header and payload into an open writer.
    pub fn encode_into(&self, w: &mut WireWriter) {
        w.write_u64(1 << self.tag());
        match self {
            Self::ListString(items) => {
                write_count(w, items.len());
                for item in items {
                    w.write_str(item);
                }
            }
            Self::MapOfMaps(outer) => {
                write_count(w, outer.len());
                for (key, inner) in outer {
                    w.write_str(key);
                    write_count(w, inner.len());
                    for (k, v) in inner {
                        w.write_str(k);
                        w.write_str(v);
                    }
                }
            }
            Self::ListDouble(items) => {
                write_count(w, items.len());
                for item in items {
                    w.write_f64(*item);
                }
            }
            Self::MapOfListsDouble(outer) => {
                write_count(w, outer.len());
                for (key, items) in outer {
                    w.write_str(key);
                    write_count(w, items.len());
                    for item in items {
                        w.write_f64(*item);
                    }
                }
            }
            Self::MapOfMapsDouble(outer) => {
                write_count(w, outer.len());
                for (key, inner) in outer {
                    w.write_str(key);
                    write_count(w, inner.len());
                    for (k, v) in inner {
                        w.write_str(k);
                        w.write_f64(*v);
                    }
                }
            }
        }
    }

    /// Decodes a mask header and payload from an open reader.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownMask`] for headers that are not exactly one
    /// known bit; otherwise fail-fast truncation errors.
    pub fn decode_from(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let mask = r.read_u64()?;
        if mask.count_ones() != 1 || mask.trailing_zeros() > 4 {
            return Err(CodecError::UnknownMask(mask));
        }
        match mask.trailing_zeros() {
            0 => {
                let count = r.read_collection_len()?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(r.read_str()?);
                }
                Ok(Self::ListString(items))
            }
            1 => {
                let count = r.read_collection_len()?;
                let mut outer = BTreeMap::new();
                for _ in 0..count {
                    let key = r.read_str()?;
                    let inner_count = r.read_collection_len()?;
                    let mut inner = BTreeMap::new();
                    for _ in 0..inner_count {
                        let k = r.read_str()?;
                        let v = r.read_str()?;
                        inner.insert(k, v);
                    }
                    outer.insert(key, inner);
                }
                Ok(Self::MapOfMaps(outer))
            }
            2 => {
                let count = r.read_collection_len()?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(r.read_f64()?);
                }
                Ok(Self::ListDouble(items))
            }
            3 => {
                let count = r.read_collection_len()?;
                let mut outer = BTreeMap::new();
                for _ in 0..count {
                    let key = r.read_str()?;
                    let inner_count = r.read_collection_len()?;
                    let mut items = Vec::with_capacity(inner_count as usize);
                    for _ in 0..inner_count {
                        items.push(r.read_f64()?);
                    }
                    outer.insert(key, items);
                }
                Ok(Self::MapOfListsDouble(outer))
            }
            _ => {
                let count = r.read_collection_len()?;
                let mut outer = BTreeMap::new();
                for _ in 0..count {
                    let key = r.read_str()?;
                    let inner_count = r.read_collection_len()?;
                    let mut inner = BTreeMap::new();
                    for _ in 0..inner_count {
                        let k = r.read_str()?;
                        let v = r.read_f64()?;
                        inner.insert(k, v);
                    }
                    outer.insert(key, inner);
                }
                Ok(Self::MapOfMapsDouble(outer))
            }
        }
    }
}

fn write_count(w: &mut WireWriter, count: usize) {
    w.write_u32(u32::try_from(count).unwrap_or(u32::MAX));
}

/// The windowed world as one observer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldView {
    /// Dense terrain and entity window, occlusion applied.
    pub grid_view: GridView,
    /// Component bundles for every id referenced by the window, keyed
    /// by raw id. Virtual terrain ids are negative.
    pub entities: BTreeMap<i32, EntityInterface>,
}

impl WorldView {
    fn encode_into(&self, w: &mut WireWriter) {
        self.grid_view.encode_into(w);
        encode_entity_map(w, &self.entities);
    }

    fn decode_from(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let grid_view = GridView::decode_from(r)?;
        let entities = decode_entity_map(r)?;
        Ok(Self { grid_view, entities })
    }
}

/// One complete perception response for one observer.
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionResponse {
    /// Raw observer id.
    pub entity: i32,
    /// The observer's view of the world.
    pub world_view: WorldView,
    /// Tick count at assembly time.
    pub ticks: u64,
    /// Details for items carried by the observer, keyed by raw item id.
    pub items_entities: BTreeMap<i32, EntityInterface>,
    /// Query results keyed by channel id.
    pub query_responses: BTreeMap<i32, QueryResponse>,
}

impl PerceptionResponse {
    /// Serializes the whole response into one buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(256);
        w.write_i32(self.entity);
        w.write_u64(self.ticks);
        self.world_view.encode_into(&mut w);
        encode_entity_map(&mut w, &self.items_entities);
        write_count(&mut w, self.query_responses.len());
        for (channel, response) in &self.query_responses {
            w.write_i32(*channel);
            response.encode_into(&mut w);
        }
        w.into_bytes()
    }

    /// Decodes a buffer produced by [`PerceptionResponse::to_bytes`].
    ///
    /// # Errors
    ///
    /// Fails fast on truncation, unknown masks, and trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = WireReader::new(bytes);
        let entity = r.read_i32()?;
        let ticks = r.read_u64()?;
        let world_view = WorldView::decode_from(&mut r)?;
        let items_entities = decode_entity_map(&mut r)?;
        let count = r.read_collection_len()?;
        let mut query_responses = BTreeMap::new();
        for _ in 0..count {
            let channel = r.read_i32()?;
            query_responses.insert(channel, QueryResponse::decode_from(&mut r)?);
        }
        if !r.is_exhausted() {
            return Err(CodecError::TrailingBytes(r.remaining()));
        }
        Ok(Self {
            entity,
            world_view,
            ticks,
            items_entities,
            query_responses,
        })
    }
}

fn encode_entity_map(w: &mut WireWriter, entities: &BTreeMap<i32, EntityInterface>) {
    write_count(w, entities.len());
    for (id, interface) in entities {
        w.write_i32(*id);
        interface.encode_into(w);
    }
}

fn decode_entity_map(r: &mut WireReader<'_>) -> Result<BTreeMap<i32, EntityInterface>, CodecError> {
    let count = r.read_collection_len()?;
    let mut entities = BTreeMap::new();
    for _ in 0..count {
        let id = r.read_i32()?;
        entities.insert(id, EntityInterface::decode_from(r)?);
    }
    Ok(entities)
}
