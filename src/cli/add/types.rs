use crate::sampler::ImageInfo;

pub struct ImageData {
    /// 相对于图库根目录的路径
    pub path: String,
    pub data: Vec<u8>,
    pub mtime: Option<i64>,
}

pub struct HashedImageData {
    pub path: String,
    pub data: Vec<u8>,
    pub hash: Vec<u8>,
    pub mtime: Option<i64>,
}

pub struct ProcessableImage {
    pub path: String,
    pub info: ImageInfo,
    pub mtime: Option<i64>,
}
