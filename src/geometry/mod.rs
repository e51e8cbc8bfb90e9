/// 固定几何体模块
///
/// 提供沙盒中硬编码的几何体：顶点直通的三角形和旋转立方体。
///
/// # 模块结构
///
/// - `vertex`: 顶点数据结构定义
/// - `mesh`: CPU 侧网格数据
/// - `primitives`: 内置几何体
pub mod mesh;
pub mod primitives;
pub mod vertex;

// 重新导出常用类型
pub use mesh::MeshData;
pub use vertex::SceneVertex;
