//! ZDraft 原生文件格式（.zdrf）
//!
//! 16 字节文件头 + Zstd 压缩的 MessagePack 内容数组。
//! 墓碑保存为 nil，加载后下标不变。

use crate::error::FileError;
use crate::validate_contents;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use zdraft_core::content::ContentArray;
use zdraft_core::registry::ContentRegistry;

/// 文件魔数 "ZDRF"
const MAGIC: &[u8; 4] = b"ZDRF";

/// 当前文件格式版本
const FORMAT_VERSION: u32 = 1;

/// Zstd 压缩级别（1-22，3 是默认值）
const COMPRESSION_LEVEL: i32 = 3;

/// 文件头（16 字节）
#[derive(Debug)]
struct FileHeader {
    magic: [u8; 4],
    version: u32,
    /// 标志位（预留）
    flags: u32,
    /// 压缩后数据长度
    compressed_size: u32,
}

impl FileHeader {
    fn new(compressed_size: u32) -> Self {
        Self {
            magic: *MAGIC,
            version: FORMAT_VERSION,
            flags: 0,
            compressed_size,
        }
    }

    fn write(&self, writer: &mut impl Write) -> Result<(), std::io::Error> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&self.compressed_size.to_le_bytes())?;
        Ok(())
    }

    fn read(reader: &mut impl Read) -> Result<Self, FileError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(FileError::InvalidFormat(
                "Invalid magic number, not a ZDraft file".to_string(),
            ));
        }

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        let version = u32::from_le_bytes(buf);
        reader.read_exact(&mut buf)?;
        let flags = u32::from_le_bytes(buf);
        reader.read_exact(&mut buf)?;
        let compressed_size = u32::from_le_bytes(buf);

        Ok(Self {
            magic,
            version,
            flags,
            compressed_size,
        })
    }
}

/// 可序列化的文件内容
#[derive(Debug, Serialize, Deserialize)]
struct FileContent {
    contents: ContentArray,
}

/// 编码为原生格式字节
pub fn to_bytes(contents: &ContentArray) -> Result<Vec<u8>, FileError> {
    let content = FileContent {
        contents: contents.clone(),
    };
    // 内容使用 flatten 字段，必须以带字段名的 map 编码
    let msgpack_data = rmp_serde::to_vec_named(&content)?;
    let compressed_data = zstd::encode_all(msgpack_data.as_slice(), COMPRESSION_LEVEL)?;

    let size = u32::try_from(compressed_data.len())
        .map_err(|_| FileError::InvalidFormat("Drawing too large".to_string()))?;
    let mut bytes = Vec::with_capacity(16 + compressed_data.len());
    FileHeader::new(size).write(&mut bytes)?;
    bytes.extend_from_slice(&compressed_data);
    Ok(bytes)
}

/// 从原生格式字节解码并校验
pub fn from_bytes(mut reader: impl Read, registry: &ContentRegistry) -> Result<ContentArray, FileError> {
    let header = FileHeader::read(&mut reader)?;
    if header.version > FORMAT_VERSION {
        return Err(FileError::UnsupportedVersion(format!(
            "File version {} is newer than supported version {}",
            header.version, FORMAT_VERSION
        )));
    }

    let mut compressed_data = vec![0u8; header.compressed_size as usize];
    reader.read_exact(&mut compressed_data)?;
    let msgpack_data = zstd::decode_all(compressed_data.as_slice())?;
    let content: FileContent = rmp_serde::from_slice(&msgpack_data)?;

    validate_contents(&content.contents, registry)?;
    Ok(content.contents)
}

/// 保存内容数组到文件
pub fn save(contents: &ContentArray, path: &Path) -> Result<(), FileError> {
    let bytes = to_bytes(contents)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;

    tracing::info!(
        "Saved {} contents to {} ({} bytes)",
        contents.len(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// 从文件加载内容数组
pub fn load(path: &Path, registry: &ContentRegistry) -> Result<ContentArray, FileError> {
    let reader = BufReader::new(File::open(path)?);
    let contents = from_bytes(reader, registry)?;
    tracing::info!("Loaded {} contents from {}", contents.len(), path.display());
    Ok(contents)
}
