//! 身份键缓存
//!
//! 以内容的 `Rc` 指针为键缓存派生数据（几何、捕捉点、编辑点）。
//! 条目保存键和所有传递引用内容的 `Weak`：
//! - 命中要求键与每个依赖都是同一个对象且仍然存活
//! - 结构共享保证"改过的内容"一定是新对象，因此无需手动失效
//! - 键或依赖已被释放的条目由 [`IdentityCache::purge`] 回收，随容量增长自动执行
//!
//! 条目持有 `Weak`，被释放内容的内存块不会被复用，指针键因此不会冲突。
//!
//! 引用成环时，对正在计算的键的重入请求得到空值。环上各帧的结果取决于
//! 从哪个内容开始查询，因此不写入缓存；环外调用方的结果照常缓存。

use crate::content::Content;
use crate::geometry::Geometries;
use crate::math::Point2;
use crate::snap::SnapPoint;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::debug;

/// 自动清理的最小阈值
const MIN_PURGE_THRESHOLD: usize = 256;

struct CacheEntry<V> {
    key: Weak<Content>,
    deps: Vec<Weak<Content>>,
    value: Rc<V>,
}

impl<V> CacheEntry<V> {
    fn is_alive(&self) -> bool {
        self.key.strong_count() > 0 && self.deps.iter().all(|d| d.strong_count() > 0)
    }

    fn matches(&self, key: &Rc<Content>, deps: &[Rc<Content>]) -> bool {
        Weak::as_ptr(&self.key) == Rc::as_ptr(key)
            && self.key.strong_count() > 0
            && self.deps.len() == deps.len()
            && self
                .deps
                .iter()
                .zip(deps)
                .all(|(w, d)| Weak::as_ptr(w) == Rc::as_ptr(d))
    }
}

fn ptr_key(content: &Rc<Content>) -> usize {
    Rc::as_ptr(content) as usize
}

/// 计算栈中的一帧
struct Frame {
    key: usize,
    /// 计算过程中重入了本帧或更外层的键，结果不缓存
    in_cycle: bool,
}

/// 身份键缓存
pub struct IdentityCache<V> {
    entries: RefCell<HashMap<usize, CacheEntry<V>>>,
    /// 正在计算的键
    computing: RefCell<Vec<Frame>>,
    purge_at: Cell<usize>,
}

impl<V: Default> IdentityCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            computing: RefCell::new(Vec::new()),
            purge_at: Cell::new(MIN_PURGE_THRESHOLD),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// 查询缓存；键或依赖身份不一致时未命中
    pub fn get(&self, key: &Rc<Content>, deps: &[Rc<Content>]) -> Option<Rc<V>> {
        let entries = self.entries.borrow();
        let entry = entries.get(&ptr_key(key))?;
        entry.matches(key, deps).then(|| entry.value.clone())
    }

    /// 查询缓存，未命中时计算并保存
    ///
    /// 计算期间不持有内部借用，`compute` 可以递归查询本缓存。
    /// 对正在计算的键的重入请求返回空值，环上的帧不写入缓存。
    pub fn get_or_compute<F>(&self, key: &Rc<Content>, deps: &[Rc<Content>], compute: F) -> Rc<V>
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key, deps) {
            return value;
        }

        let id = ptr_key(key);
        {
            let mut computing = self.computing.borrow_mut();
            if let Some(start) = computing.iter().position(|frame| frame.key == id) {
                debug!("Reference cycle while deriving {}", key.type_name());
                for frame in &mut computing[start..] {
                    frame.in_cycle = true;
                }
                return Rc::new(V::default());
            }
            computing.push(Frame {
                key: id,
                in_cycle: false,
            });
        }

        let value = Rc::new(compute());
        let in_cycle = self
            .computing
            .borrow_mut()
            .pop()
            .is_some_and(|frame| frame.in_cycle);

        if !in_cycle {
            self.insert(key, deps, value.clone());
        }
        value
    }

    fn insert(&self, key: &Rc<Content>, deps: &[Rc<Content>], value: Rc<V>) {
        let len = {
            let mut entries = self.entries.borrow_mut();
            entries.insert(
                ptr_key(key),
                CacheEntry {
                    key: Rc::downgrade(key),
                    deps: deps.iter().map(Rc::downgrade).collect(),
                    value,
                },
            );
            entries.len()
        };

        if len > self.purge_at.get() {
            self.purge();
            self.purge_at
                .set((self.len() * 2).max(MIN_PURGE_THRESHOLD));
        }
    }

    /// 回收键或依赖已被释放的条目，返回回收数量
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_alive());
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Purged {} stale cache entries", removed);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<V: Default> Default for IdentityCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// 三个独立的派生数据缓存，键规则相同
#[derive(Default)]
pub struct DerivedCaches {
    pub geometries: IdentityCache<Geometries>,
    pub snap_points: IdentityCache<Vec<SnapPoint>>,
    pub edit_points: IdentityCache<Vec<Point2>>,
}

impl DerivedCaches {
    pub fn purge(&self) -> usize {
        self.geometries.purge() + self.snap_points.purge() + self.edit_points.purge()
    }

    pub fn clear(&self) {
        self.geometries.clear();
        self.snap_points.clear();
        self.edit_points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CircleContent;

    fn circle(r: f64) -> Rc<Content> {
        Rc::new(Content::from(CircleContent::new(Point2::origin(), r)))
    }

    #[test]
    fn test_hit_requires_identity() {
        let cache: IdentityCache<Vec<u32>> = IdentityCache::new();
        let key = circle(1.0);
        let dep = circle(2.0);

        let first = cache.get_or_compute(&key, &[dep.clone()], || vec![1]);
        let second = cache.get_or_compute(&key, &[dep.clone()], || vec![2]);
        assert!(Rc::ptr_eq(&first, &second));

        // 值相等但身份不同的依赖不命中
        let other_dep = circle(2.0);
        let third = cache.get_or_compute(&key, &[other_dep], || vec![3]);
        assert_eq!(*third, vec![3]);
    }

    #[test]
    fn test_purge_dead_entries() {
        let cache: IdentityCache<Vec<u32>> = IdentityCache::new();
        let kept = circle(1.0);
        cache.get_or_compute(&kept, &[], Vec::new);
        {
            let dropped = circle(2.0);
            cache.get_or_compute(&dropped, &[], Vec::new);
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&kept, &[]).is_some());
    }

    #[test]
    fn test_reentrant_request_returns_empty() {
        let cache: IdentityCache<Vec<u32>> = IdentityCache::new();
        let key = circle(1.0);
        let value = cache.get_or_compute(&key, &[], || {
            let inner = cache.get_or_compute(&key, &[], || vec![9]);
            assert!(inner.is_empty());
            vec![1]
        });
        assert_eq!(*value, vec![1]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cycle_frames_not_cached() {
        let cache: IdentityCache<Vec<u32>> = IdentityCache::new();
        let outer = circle(1.0);
        let a = circle(2.0);
        let b = circle(3.0);

        // outer → a → b → a：a、b 在环上，outer 在环外
        let value = cache.get_or_compute(&outer, &[], || {
            cache.get_or_compute(&a, &[], || {
                let inner = cache.get_or_compute(&b, &[], || {
                    let again = cache.get_or_compute(&a, &[], || vec![7]);
                    assert!(again.is_empty());
                    vec![2]
                });
                let mut v = vec![1];
                v.extend(inner.iter());
                v
            })
            .to_vec()
        });
        assert_eq!(*value, vec![1, 2]);
        assert!(cache.get(&outer, &[]).is_some());
        assert!(cache.get(&a, &[]).is_none());
        assert!(cache.get(&b, &[]).is_none());
    }

    #[test]
    fn test_automatic_purge() {
        let cache: IdentityCache<Vec<u32>> = IdentityCache::new();
        for i in 0..(MIN_PURGE_THRESHOLD * 2) {
            let key = circle(i as f64 + 1.0);
            cache.get_or_compute(&key, &[], Vec::new);
        }
        assert!(cache.len() <= MIN_PURGE_THRESHOLD + 1);
    }
}
