mod cube;

pub use cube::CubeViewer;
