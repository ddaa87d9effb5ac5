//! Scalar selectors shared by the integer-comparison family of predicates
//! (§3 "Integer comparison", §4.G size/time/perm sketches).

use std::time::SystemTime;

/// The three-way comparison an integer-comparison node applies (`-n`, `n`,
/// `+n` in find's own syntax).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Lt,
    Gt,
}

impl Cmp {
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Gt => lhs > rhs,
        }
    }
}

/// Plain integer metadata fields (§3: "depth, links, inode, uid, gid").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntField {
    Depth,
    Links,
    Inode,
    Uid,
    Gid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntCmpSpec {
    pub field: IntField,
    pub cmp: Cmp,
    pub operand: i64,
}

/// Units `-size` rounds up to before applying the comparison (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Blocks512,
    Bytes,
    Words2,
    KiB,
    MiB,
    GiB,
    TiB,
    PiB,
}

impl SizeUnit {
    /// Size, in bytes, of one unit.
    pub fn unit_bytes(self) -> u64 {
        match self {
            SizeUnit::Blocks512 => 512,
            SizeUnit::Bytes => 1,
            SizeUnit::Words2 => 2,
            SizeUnit::KiB => 1024,
            SizeUnit::MiB => 1024 * 1024,
            SizeUnit::GiB => 1024 * 1024 * 1024,
            SizeUnit::TiB => 1024u64.pow(4),
            SizeUnit::PiB => 1024u64.pow(5),
        }
    }

    /// Round `bytes` up to a whole number of units, per §4.G.
    pub fn round_up(self, bytes: u64) -> u64 {
        let unit = self.unit_bytes();
        bytes.div_ceil(unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeCmpSpec {
    pub unit: SizeUnit,
    pub cmp: Cmp,
    pub operand: i64,
}

/// Which stat timestamp a time predicate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    Mtime,
    Atime,
    Ctime,
}

/// Granularity at which the time difference is rounded before comparison
/// (§4.G: "compute sign(stat_time - reference_time) in the chosen unit").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Days,
}

impl TimeUnit {
    pub fn seconds(self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Days => 60 * 60 * 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeCmpSpec {
    pub which: TimeKind,
    pub unit: TimeUnit,
    pub cmp: Cmp,
    /// Either a literal instant (usually "now") or a resolved reference
    /// file's timestamp (`-newer`/`-anewer`/`-cnewer`, SPEC_FULL.md
    /// supplement). The predicate compares `sign(stat_time - reference)` in
    /// `unit`-sized steps against `operand` (§4.G "time").
    pub reference: SystemTime,
    /// `0` for the `-newer`-family two-file comparisons, where `cmp` alone
    /// (`Gt`/`Lt`) carries the whole test.
    pub operand: i64,
}

/// Mode-comparison modes (`-perm MODE`, `-perm -MODE`, `-perm /MODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCmpKind {
    Exact,
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCmpSpec {
    pub set_bits: u32,
    pub clear_bits: u32,
    pub cmp: ModeCmpKind,
}

/// Tri-state platform predicates the optimizer lattice tracks by name
/// (§3 `predicates[K]`). ACL/capability/xattr checks are behind the
/// capability trait of §9; the rest are computed directly from stat data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriPred {
    Readable,
    Writable,
    Executable,
    Acl,
    Capable,
    Empty,
    Hidden,
    NoGroup,
    NoUser,
    Sparse,
    XAttr,
}

impl TriPred {
    pub const ALL: [TriPred; 11] = [
        TriPred::Readable,
        TriPred::Writable,
        TriPred::Executable,
        TriPred::Acl,
        TriPred::Capable,
        TriPred::Empty,
        TriPred::Hidden,
        TriPred::NoGroup,
        TriPred::NoUser,
        TriPred::Sparse,
        TriPred::XAttr,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).expect("exhaustive ALL")
    }
}

pub const NUM_TRI_PREDS: usize = TriPred::ALL.len();

/// File-type variants (§3). `Error` is a pseudo-type meaning the entry could
/// not be enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Unknown,
    BlockDev,
    CharDev,
    Dir,
    Door,
    Fifo,
    Symlink,
    Regular,
    Socket,
    Whiteout,
    Error,
}

impl FileKind {
    pub const ALL: [FileKind; 10] = [
        FileKind::Unknown,
        FileKind::BlockDev,
        FileKind::CharDev,
        FileKind::Dir,
        FileKind::Door,
        FileKind::Fifo,
        FileKind::Symlink,
        FileKind::Regular,
        FileKind::Socket,
        FileKind::Whiteout,
    ];

    pub fn bit(self) -> u16 {
        match self {
            FileKind::Unknown => 1 << 0,
            FileKind::BlockDev => 1 << 1,
            FileKind::CharDev => 1 << 2,
            FileKind::Dir => 1 << 3,
            FileKind::Door => 1 << 4,
            FileKind::Fifo => 1 << 5,
            FileKind::Symlink => 1 << 6,
            FileKind::Regular => 1 << 7,
            FileKind::Socket => 1 << 8,
            FileKind::Whiteout => 1 << 9,
            FileKind::Error => 0,
        }
    }
}

/// Bitmask over `FileKind` variants, the optimizer lattice's `types`/`xtypes`
/// component (§3). §8 calls out that an 18-bit-wide mask set to `!0` must
/// still compare equal to "top"; we normalize every mask to `TOP_MASK` bits
/// on construction so that property holds regardless of how many variants we
/// actually enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMask(pub u32);

impl TypeMask {
    /// Only the low 10 bits are meaningful (one per `FileKind`); §8 exercises
    /// an 18-bit-wide all-ones mask and expects it to behave as "top", so we
    /// mask down to the bits we use rather than relying on width.
    pub const TOP_BITS: u32 = (1 << FileKind::ALL.len()) - 1;

    pub const BOTTOM: TypeMask = TypeMask(0);
    pub const TOP: TypeMask = TypeMask(Self::TOP_BITS);

    pub fn single(kind: FileKind) -> Self {
        TypeMask(kind.bit() as u32)
    }

    pub fn from_raw(bits: u32) -> Self {
        TypeMask(bits & Self::TOP_BITS)
    }

    pub fn contains(self, kind: FileKind) -> bool {
        self.0 & (kind.bit() as u32) != 0
    }

    pub fn is_bottom(self) -> bool {
        self.0 == 0
    }

    pub fn is_top(self) -> bool {
        self.0 & Self::TOP_BITS == Self::TOP_BITS
    }

    pub fn union(self, other: TypeMask) -> TypeMask {
        TypeMask::from_raw(self.0 | other.0)
    }

    pub fn intersect(self, other: TypeMask) -> TypeMask {
        TypeMask::from_raw(self.0 & other.0)
    }

    pub fn complement(self) -> TypeMask {
        TypeMask::from_raw(!self.0)
    }
}

/// Which path-shaped string a `StringMatch`/`Regex` node reads (§4.G
/// name/path/lname predicates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringTarget {
    Name,
    Path,
    LinkTarget,
}
