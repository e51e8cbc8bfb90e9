//! 内置几何体
//!
//! 三角形直接以裁剪空间坐标给出；立方体在模型空间，边长为 1。

use super::mesh::MeshData;
use super::vertex::SceneVertex;

/// 三角形的三个顶点（裁剪空间）
pub const TRIANGLE_POSITIONS: [[f32; 3]; 3] = [
    [-0.5, -0.5, 0.0],
    [0.5, -0.5, 0.0],
    [0.0, 0.5, 0.0],
];

// 立方体每个面的颜色：+X, -X, +Y, -Y, +Z, -Z
const CUBE_FACE_COLORS: [[f32; 4]; 6] = [
    [0.9, 0.3, 0.3, 1.0],
    [0.3, 0.9, 0.3, 1.0],
    [0.3, 0.3, 0.9, 1.0],
    [0.9, 0.9, 0.3, 1.0],
    [0.9, 0.3, 0.9, 1.0],
    [0.3, 0.9, 0.9, 1.0],
];

/// 单色三角形
pub fn triangle(color: [f32; 4]) -> MeshData {
    let mut mesh = MeshData::with_name("triangle");
    mesh.vertices = TRIANGLE_POSITIONS
        .iter()
        .map(|p| SceneVertex::new(*p, color))
        .collect();
    mesh.indices = vec![0, 1, 2];
    mesh
}

/// 每个面一种颜色的立方体，共 24 个顶点 36 个索引
pub fn cube() -> MeshData {
    let h = 0.5;
    // 每个面按逆时针（从面外侧看）列出 4 个角
    let faces: [[[f32; 3]; 4]; 6] = [
        [[h, -h, -h], [h, h, -h], [h, h, h], [h, -h, h]],
        [[-h, -h, h], [-h, h, h], [-h, h, -h], [-h, -h, -h]],
        [[-h, h, -h], [-h, h, h], [h, h, h], [h, h, -h]],
        [[-h, -h, h], [-h, -h, -h], [h, -h, -h], [h, -h, h]],
        [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
        [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
    ];

    let mut mesh = MeshData::with_name("cube");
    for (face, color) in faces.iter().zip(CUBE_FACE_COLORS.iter()) {
        let base = mesh.vertices.len() as u16;
        mesh.vertices
            .extend(face.iter().map(|p| SceneVertex::new(*p, *color)));
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn test_triangle() {
        let mesh = triangle([1.0, 0.5, 0.2, 1.0]);
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.vertices.iter().all(|v| v.color == [1.0, 0.5, 0.2, 1.0]));
        assert_eq!(mesh.vertices[2].position, [0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_cube_faces_point_outwards() {
        let mesh = cube();
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);

        for tri in mesh.indices.chunks(3) {
            let a = mesh.vertices[tri[0] as usize].position;
            let b = mesh.vertices[tri[1] as usize].position;
            let c = mesh.vertices[tri[2] as usize].position;
            let normal = cross(sub(b, a), sub(c, a));
            let centroid = [
                (a[0] + b[0] + c[0]) / 3.0,
                (a[1] + b[1] + c[1]) / 3.0,
                (a[2] + b[2] + c[2]) / 3.0,
            ];
            let dot = normal[0] * centroid[0] + normal[1] * centroid[1] + normal[2] * centroid[2];
            assert!(dot > 0.0, "triangle {:?} faces inwards", tri);
        }
    }
}
