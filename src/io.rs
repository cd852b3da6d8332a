// JSON persistence of the parameters and tables

use crate::error::Result;
use crate::parameters::Parameters;
use crate::tables::EmData;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

/// Serde adapter for flat buffers: an empty buffer is written as `null`, and
/// `null` (or an absent field, with `#[serde(default)]`) reads back as empty.
pub mod flat_array {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        if values.is_empty() {
            serializer.serialize_none()
        } else {
            serializer.collect_seq(values)
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }
}

/// Everything a worker needs to run the kernel, as one serialisable unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmState {
    #[serde(default)]
    pub parameters: Parameters,
    pub data: EmData,
}

impl EmState {
    pub fn new(parameters: Parameters, data: EmData) -> Self {
        EmState { parameters, data }
    }

    /// Check the parameters and every table.
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;
        self.data.validate()
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a state.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let state: EmState = serde_json::from_str(text)?;
        state.validate()?;
        Ok(state)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        let state: EmState = serde_json::from_reader(reader)?;
        state.validate()?;
        Ok(state)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), "EM state written");
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let state = Self::read_json(BufReader::new(File::open(path)?))?;
        info!(
            path = %path.display(),
            materials = state.data.material_data.len(),
            mat_cuts = state.data.mat_cut_data.len(),
            "EM state loaded"
        );
        Ok(state)
    }
}
