//! Bone hierarchy
//!
//! A skeleton is a forest of bones stored in a flat array. Each bone names
//! its parent by index; a negative parent marks a root. The hierarchy is
//! validated once, when the skeleton is built, so the evaluator can trust it.

use crate::foundation::math::Mat4;

/// One node of the hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// Bone name, used to resolve clips and for diagnostics
    pub name: String,
    /// Parent index; negative for roots
    pub parent: i32,
    /// Bind-pose inverse (mesh space to bone space)
    pub offset: Mat4,
}

impl Bone {
    /// Create a bone
    pub fn new(name: impl Into<String>, parent: i32, offset: Mat4) -> Self {
        Self {
            name: name.into(),
            parent,
            offset,
        }
    }

    /// Create a root bone
    pub fn root(name: impl Into<String>, offset: Mat4) -> Self {
        Self::new(name, -1, offset)
    }

    /// Whether this bone has no parent
    pub const fn is_root(&self) -> bool {
        self.parent < 0
    }

    /// Parent index, if any
    pub fn parent_index(&self) -> Option<usize> {
        usize::try_from(self.parent).ok()
    }
}

/// Errors detected while validating a hierarchy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkeletonError {
    /// A parent index points past the end of the bone array
    #[error("Bone {bone} has parent {parent}, but the skeleton has {count} bones")]
    ParentOutOfRange {
        /// Offending bone
        bone: usize,
        /// Its parent index
        parent: i32,
        /// Number of bones
        count: usize,
    },

    /// A bone names itself as parent
    #[error("Bone {bone} is its own parent")]
    SelfParent {
        /// Offending bone
        bone: usize,
    },

    /// Following parent links from a bone never reaches a root
    #[error("Bone {bone} is part of a parent cycle")]
    Cycle {
        /// A bone on the cycle
        bone: usize,
    },

    /// A non-empty skeleton without any root
    #[error("Skeleton has no root bone")]
    MissingRoot,
}

/// Validated bone forest with precomputed roots and children
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl Skeleton {
    /// Validate `bones` and build the child lists
    pub fn new(bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        let count = bones.len();
        for (index, bone) in bones.iter().enumerate() {
            match bone.parent_index() {
                Some(parent) if parent >= count => {
                    return Err(SkeletonError::ParentOutOfRange {
                        bone: index,
                        parent: bone.parent,
                        count,
                    })
                }
                Some(parent) if parent == index => return Err(SkeletonError::SelfParent { bone: index }),
                _ => {}
            }
        }

        let roots: Vec<usize> = (0..count).filter(|&i| bones[i].is_root()).collect();
        if count > 0 && roots.is_empty() {
            return Err(SkeletonError::MissingRoot);
        }

        // A chain of parent links longer than the bone count must revisit a bone
        for start in 0..count {
            let mut current = start;
            let mut steps = 0;
            while let Some(parent) = bones[current].parent_index() {
                steps += 1;
                if steps > count {
                    return Err(SkeletonError::Cycle { bone: start });
                }
                current = parent;
            }
        }

        let mut children = vec![Vec::new(); count];
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent_index() {
                children[parent].push(index);
            }
        }

        Ok(Self { bones, roots, children })
    }

    /// A skeleton without bones
    pub fn empty() -> Self {
        Self::default()
    }

    /// All bones, in index order
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Bone at `index`
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    /// Number of bones
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Whether there are no bones
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Indices of root bones
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Direct children of `index`
    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map_or(&[], Vec::as_slice)
    }

    /// Index of the bone called `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(name: &str, parent: i32) -> Bone {
        Bone::new(name, parent, Mat4::identity())
    }

    #[test]
    fn test_forest_structure() {
        let skeleton = Skeleton::new(vec![
            bone("hips", -1),
            bone("spine", 0),
            bone("prop", -1),
            bone("head", 1),
            bone("leg", 0),
        ])
        .unwrap();

        assert_eq!(skeleton.roots(), &[0, 2]);
        assert_eq!(skeleton.children(0), &[1, 4]);
        assert_eq!(skeleton.children(1), &[3]);
        assert!(skeleton.children(3).is_empty());
        assert!(skeleton.children(99).is_empty());
        assert_eq!(skeleton.find("head"), Some(3));
    }

    #[test]
    fn test_child_may_precede_parent() {
        let skeleton = Skeleton::new(vec![bone("hand", 2), bone("root", -1), bone("arm", 1)]).unwrap();
        assert_eq!(skeleton.roots(), &[1]);
        assert_eq!(skeleton.children(2), &[0]);
    }

    #[test]
    fn test_rejects_out_of_range_parent() {
        let err = Skeleton::new(vec![bone("root", -1), bone("child", 5)]).unwrap_err();
        assert_eq!(
            err,
            SkeletonError::ParentOutOfRange {
                bone: 1,
                parent: 5,
                count: 2
            }
        );
    }

    #[test]
    fn test_rejects_self_parent() {
        let err = Skeleton::new(vec![bone("root", -1), bone("loop", 1)]).unwrap_err();
        assert_eq!(err, SkeletonError::SelfParent { bone: 1 });
    }

    #[test]
    fn test_rejects_cycle_beside_valid_root() {
        let err = Skeleton::new(vec![bone("root", -1), bone("a", 2), bone("b", 1)]).unwrap_err();
        assert!(matches!(err, SkeletonError::Cycle { bone: 1 | 2 }));
    }

    #[test]
    fn test_rejects_rootless_skeleton() {
        let err = Skeleton::new(vec![bone("a", 1), bone("b", 0)]).unwrap_err();
        assert_eq!(err, SkeletonError::MissingRoot);
        assert!(Skeleton::new(Vec::new()).is_ok_and(|s| s.is_empty()));
    }
}
