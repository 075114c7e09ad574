use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Binary script image magic + format version.
pub const IMAGE_MAGIC: &[u8; 4] = b"GSX\x01";

const MAX_NAME_LEN: u32 = 1024;
const MAX_FUNCTIONS: u32 = 100_000;
const MAX_CODE_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug)]
pub enum LoaderError {
    Io(std::io::Error),
    Format(String),
    Security(String),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::Io(e) => write!(f, "I/O error: {}", e),
            LoaderError::Format(msg) => write!(f, "invalid script image: {}", msg),
            LoaderError::Security(msg) => write!(f, "rejected script image: {}", msg),
        }
    }
}

impl std::error::Error for LoaderError {}

impl From<std::io::Error> for LoaderError {
    fn from(e: std::io::Error) -> Self {
        LoaderError::Io(e)
    }
}

/// A named entry point inside a script, relative to the script start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol {
    pub name: String,
    pub offset: u32,
}

/// One compiled script: code, function symbols and an optional raw debug-map blob.
///
/// The debug-map blob is a `u32` record count followed by that many
/// `{offset: u32, line: u16, col: u16}` little-endian records. The VM never
/// interprets it; it is handed to load listeners as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptImage {
    pub name: String,
    pub functions: Vec<FunctionSymbol>,
    pub code: Vec<u8>,
    pub devmap: Option<Vec<u8>>,
}

impl ScriptImage {
    /// Read a script image.
    ///
    /// # Security
    /// Lengths and counts are bounded before anything is allocated.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, LoaderError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != IMAGE_MAGIC {
            return Err(LoaderError::Format(
                "Invalid binary magic or version".to_string(),
            ));
        }

        let name = read_name(reader)?;

        let function_count = reader.read_u32::<LittleEndian>()?;
        if function_count > MAX_FUNCTIONS {
            return Err(LoaderError::Security(format!(
                "Function count too large: {}",
                function_count
            )));
        }
        let mut functions = Vec::with_capacity(function_count as usize);
        for _ in 0..function_count {
            let name = read_name(reader)?;
            let offset = reader.read_u32::<LittleEndian>()?;
            functions.push(FunctionSymbol { name, offset });
        }

        let code = read_blob(reader, "Bytecode")?;
        for f in &functions {
            if f.offset as usize >= code.len() {
                return Err(LoaderError::Format(format!(
                    "Function '{}' starts outside the code ({} >= {})",
                    f.name,
                    f.offset,
                    code.len()
                )));
            }
        }

        let devmap = match reader.read_u8()? {
            0 => None,
            1 => Some(read_blob(reader, "Debug map")?),
            tag => {
                return Err(LoaderError::Format(format!(
                    "Unknown debug map tag: {}",
                    tag
                )))
            }
        };

        Ok(Self {
            name,
            functions,
            code,
            devmap,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), LoaderError> {
        writer.write_all(IMAGE_MAGIC)?;
        write_name(writer, &self.name)?;
        writer.write_u32::<LittleEndian>(self.functions.len() as u32)?;
        for f in &self.functions {
            write_name(writer, &f.name)?;
            writer.write_u32::<LittleEndian>(f.offset)?;
        }
        writer.write_u32::<LittleEndian>(self.code.len() as u32)?;
        writer.write_all(&self.code)?;
        match &self.devmap {
            Some(blob) => {
                writer.write_u8(1)?;
                writer.write_u32::<LittleEndian>(blob.len() as u32)?;
                writer.write_all(blob)?;
            }
            None => writer.write_u8(0)?,
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write(&mut out);
        out
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.functions
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

fn read_name<R: Read>(reader: &mut R) -> Result<String, LoaderError> {
    let len = reader.read_u32::<LittleEndian>()?;
    // SECURITY: Allocation Bomb Protection
    if len > MAX_NAME_LEN {
        return Err(LoaderError::Security(format!(
            "Name length exceeds limit of {}: {}",
            MAX_NAME_LEN, len
        )));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| LoaderError::Format("Invalid UTF-8 in name".to_string()))
}

fn read_blob<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>, LoaderError> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > MAX_CODE_LEN {
        return Err(LoaderError::Security(format!(
            "{} length too large: {}",
            what, len
        )));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> Result<(), LoaderError> {
    writer.write_u32::<LittleEndian>(name.len() as u32)?;
    writer.write_all(name.as_bytes())?;
    Ok(())
}
