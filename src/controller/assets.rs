//! Asset loading collaborators.
//!
//! Loaders only deliver bytes; decoding and scene insertion happen in the
//! success callback. A failed load never reaches the callback: it is logged
//! and dropped.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};

use crate::config::LandscapeSettings;
use crate::error::{Error, Result};
use crate::model::{NodeId, SceneGraph, SceneNode};
use crate::utils::{create_terrain_mesh, Mesh};

pub type OnLoaded = Box<dyn FnOnce(Vec<u8>)>;

pub trait AssetLoader {
    fn load(&self, path: &str, on_success: OnLoaded);
}

/// Reads assets from disk relative to `root`. Completion is synchronous.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FsLoader {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetLoader for FsLoader {
    fn load(&self, path: &str, on_success: OnLoaded) {
        let full = self.root.join(path);
        match std::fs::read(&full) {
            Ok(bytes) => {
                tracing::info!(path, bytes = bytes.len(), "asset loaded");
                on_success(bytes);
            }
            Err(source) => {
                let err = Error::AssetIo { path: full.display().to_string(), source };
                tracing::warn!("{err}");
            }
        }
    }
}

/// Fetches assets over HTTP relative to the page. Completion is async.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct FetchLoader;

#[cfg(target_arch = "wasm32")]
impl FetchLoader {
    async fn fetch_bytes(path: &str) -> Result<Vec<u8>> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        let fail = |reason: String| Error::AssetFetch { path: path.to_string(), reason };
        let window = web_sys::window().ok_or_else(|| fail("no global `window`".into()))?;
        let resp = JsFuture::from(window.fetch_with_str(path))
            .await
            .map_err(|e| fail(format!("{e:?}")))?;
        let resp: web_sys::Response = resp.dyn_into().map_err(|e| fail(format!("{e:?}")))?;
        if !resp.ok() {
            return Err(fail(format!("HTTP {}", resp.status())));
        }
        let buf = resp.array_buffer().map_err(|e| fail(format!("{e:?}")))?;
        let buf = JsFuture::from(buf).await.map_err(|e| fail(format!("{e:?}")))?;
        Ok(js_sys::Uint8Array::new(&buf).to_vec())
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetLoader for FetchLoader {
    fn load(&self, path: &str, on_success: OnLoaded) {
        let path = path.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            match Self::fetch_bytes(&path).await {
                Ok(bytes) => {
                    tracing::info!(path = %path, bytes = bytes.len(), "asset loaded");
                    on_success(bytes);
                }
                Err(err) => tracing::warn!("{err}"),
            }
        });
    }
}

/// Decode a grayscale heightmap (PNG or WebP) into a terrain mesh.
pub fn decode_heightmap(bytes: &[u8], settings: &LandscapeSettings) -> Result<Mesh> {
    let img = image::load_from_memory(bytes)?.to_luma8();
    let (w, h) = img.dimensions();
    if w < 2 || h < 2 {
        return Err(Error::HeightmapTooSmall { width: w, height: h });
    }

    let max = settings.max_resolution.max(2);
    let step = (w.max(h) + max - 1) / max;
    let step = step.max(1);
    let cols = ((w - 1) / step + 1) as usize;
    let rows = ((h - 1) / step + 1) as usize;

    let mut heights = Vec::with_capacity(cols * rows);
    for z in 0..rows as u32 {
        for x in 0..cols as u32 {
            heights.push(img.get_pixel(x * step, z * step).0[0] as f32 / 255.0);
        }
    }

    let mut mesh = create_terrain_mesh(&heights, cols, rows, settings.size, settings.max_height);
    if settings.offset != Vec3::ZERO {
        mesh.transform(Mat4::from_translation(settings.offset));
    }
    Ok(mesh)
}

/// Request the landscape heightmap. On success the mesh is tagged to cast
/// and receive shadows and inserted into `scene`.
pub fn spawn_landscape(
    loader: &dyn AssetLoader,
    scene: Rc<RefCell<SceneGraph>>,
    settings: &LandscapeSettings,
) {
    let settings = settings.clone();
    let path = settings.heightmap_path.clone();
    loader.load(
        &path,
        Box::new(move |bytes| match decode_heightmap(&bytes, &settings) {
            Ok(mesh) => {
                let node = SceneNode::new("landscape", mesh).with_shadows(true, true);
                let id: NodeId = scene.borrow_mut().add(node);
                tracing::info!(id = id.0, "landscape inserted");
            }
            Err(err) => tracing::warn!(path = %settings.heightmap_path, "{err}"),
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};
    use std::collections::HashMap;
    use std::io::Cursor;

    fn png(w: u32, h: u32, f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
        let img = GrayImage::from_fn(w, h, |x, y| Luma([f(x, y)]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// In-memory loader; unknown paths fail like a missing file.
    struct MapLoader(HashMap<String, Vec<u8>>);

    impl AssetLoader for MapLoader {
        fn load(&self, path: &str, on_success: OnLoaded) {
            if let Some(bytes) = self.0.get(path) {
                on_success(bytes.clone());
            }
        }
    }

    fn settings() -> LandscapeSettings {
        LandscapeSettings {
            heightmap_path: "hm.png".into(),
            size: 100.0,
            max_height: 20.0,
            max_resolution: 256,
            offset: Vec3::ZERO,
        }
    }

    #[test]
    fn heightmap_decodes_to_grid() {
        let bytes = png(5, 4, |x, _| (x * 60) as u8);
        let mesh = decode_heightmap(&bytes, &settings()).unwrap();
        assert_eq!(mesh.vertices.len(), 20);
        assert_eq!(mesh.indices.len(), 4 * 3 * 6);
        let top = mesh.vertices[4].pos[1];
        assert!((top - 240.0 / 255.0 * 20.0).abs() < 1e-4);
    }

    #[test]
    fn large_heightmaps_are_sampled_down() {
        let bytes = png(64, 64, |_, _| 128);
        let mut s = settings();
        s.max_resolution = 16;
        let mesh = decode_heightmap(&bytes, &s).unwrap();
        assert_eq!(mesh.vertices.len(), 16 * 16);
    }

    #[test]
    fn offset_moves_the_landscape() {
        let bytes = png(3, 3, |_, _| 0);
        let mut s = settings();
        s.offset = Vec3::new(0.0, -5.0, 10.0);
        let mesh = decode_heightmap(&bytes, &s).unwrap();
        assert_eq!(mesh.vertices[0].pos, [-50.0, -5.0, -40.0]);
    }

    #[test]
    fn tiny_heightmap_is_rejected() {
        let bytes = png(1, 8, |_, _| 0);
        assert!(matches!(
            decode_heightmap(&bytes, &settings()),
            Err(Error::HeightmapTooSmall { width: 1, height: 8 })
        ));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        assert!(matches!(decode_heightmap(b"not an image", &settings()), Err(Error::AssetDecode(_))));
    }

    #[test]
    fn successful_load_inserts_shadow_tagged_node() {
        let loader = MapLoader(HashMap::from([("hm.png".to_string(), png(3, 3, |_, _| 50))]));
        let scene = Rc::new(RefCell::new(SceneGraph::new()));
        spawn_landscape(&loader, scene.clone(), &settings());

        let scene = scene.borrow();
        let id = scene.find_by_name("landscape").expect("landscape node");
        let node = scene.get(id).unwrap();
        assert!(node.cast_shadow && node.receive_shadow);
        assert_eq!(node.mesh.vertices.len(), 9);
    }

    #[test]
    fn failed_load_is_dropped() {
        let loader = MapLoader(HashMap::new());
        let scene = Rc::new(RefCell::new(SceneGraph::new()));
        spawn_landscape(&loader, scene.clone(), &settings());
        assert!(scene.borrow().is_empty());
    }

    #[test]
    fn undecodable_asset_is_dropped() {
        let loader = MapLoader(HashMap::from([("hm.png".to_string(), b"junk".to_vec())]));
        let scene = Rc::new(RefCell::new(SceneGraph::new()));
        spawn_landscape(&loader, scene.clone(), &settings());
        assert!(scene.borrow().is_empty());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn fs_loader_skips_missing_files() {
        let loader = FsLoader::new("/definitely/not/here");
        let called = Rc::new(RefCell::new(false));
        let flag = called.clone();
        loader.load("nothing.png", Box::new(move |_| *flag.borrow_mut() = true));
        assert!(!*called.borrow());
    }
}
