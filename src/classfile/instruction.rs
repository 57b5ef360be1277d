//! Decoded bytecode instructions.
//!
//! The analysis never looks at raw bytes; it receives each method body as a sequence of
//! [`Instruction`]s carrying their byte offset, [`Opcode`] and decoded [`Operand`]. The `wide`
//! prefix is folded into the operand of the instruction it modifies.
//!
//! Every opcode belongs to one [`InstructionCategory`], mirroring the shapes instructions take in
//! the class file format:
//!
//! - [`InstructionCategory::Simple`] - no operand, or an inline immediate (`bipush`, `newarray`)
//! - [`InstructionCategory::Variable`] - addresses a local-variable slot (`iload`, `iinc`, `ret`)
//! - [`InstructionCategory::Branch`] - carries one relative branch offset
//! - [`InstructionCategory::Constant`] - indexes the constant pool
//! - [`InstructionCategory::Switch`] - `tableswitch` and `lookupswitch`

use std::fmt;

use strum::{EnumCount, EnumIter, FromRepr};

macro_rules! opcodes {
    ($($variant:ident = $value:literal => $mnemonic:literal,)*) => {
        /// A JVM opcode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, EnumCount)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                #[doc = concat!("`", $mnemonic, "`")]
                $variant = $value,
            )*
        }

        impl Opcode {
            /// Returns the assembler mnemonic of this opcode.
            #[must_use]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }
        }
    };
}

opcodes! {
    Nop = 0x00 => "nop",
    AconstNull = 0x01 => "aconst_null",
    IconstM1 = 0x02 => "iconst_m1",
    Iconst0 = 0x03 => "iconst_0",
    Iconst1 = 0x04 => "iconst_1",
    Iconst2 = 0x05 => "iconst_2",
    Iconst3 = 0x06 => "iconst_3",
    Iconst4 = 0x07 => "iconst_4",
    Iconst5 = 0x08 => "iconst_5",
    Lconst0 = 0x09 => "lconst_0",
    Lconst1 = 0x0a => "lconst_1",
    Fconst0 = 0x0b => "fconst_0",
    Fconst1 = 0x0c => "fconst_1",
    Fconst2 = 0x0d => "fconst_2",
    Dconst0 = 0x0e => "dconst_0",
    Dconst1 = 0x0f => "dconst_1",
    Bipush = 0x10 => "bipush",
    Sipush = 0x11 => "sipush",
    Ldc = 0x12 => "ldc",
    LdcW = 0x13 => "ldc_w",
    Ldc2W = 0x14 => "ldc2_w",
    Iload = 0x15 => "iload",
    Lload = 0x16 => "lload",
    Fload = 0x17 => "fload",
    Dload = 0x18 => "dload",
    Aload = 0x19 => "aload",
    Iload0 = 0x1a => "iload_0",
    Iload1 = 0x1b => "iload_1",
    Iload2 = 0x1c => "iload_2",
    Iload3 = 0x1d => "iload_3",
    Lload0 = 0x1e => "lload_0",
    Lload1 = 0x1f => "lload_1",
    Lload2 = 0x20 => "lload_2",
    Lload3 = 0x21 => "lload_3",
    Fload0 = 0x22 => "fload_0",
    Fload1 = 0x23 => "fload_1",
    Fload2 = 0x24 => "fload_2",
    Fload3 = 0x25 => "fload_3",
    Dload0 = 0x26 => "dload_0",
    Dload1 = 0x27 => "dload_1",
    Dload2 = 0x28 => "dload_2",
    Dload3 = 0x29 => "dload_3",
    Aload0 = 0x2a => "aload_0",
    Aload1 = 0x2b => "aload_1",
    Aload2 = 0x2c => "aload_2",
    Aload3 = 0x2d => "aload_3",
    Iaload = 0x2e => "iaload",
    Laload = 0x2f => "laload",
    Faload = 0x30 => "faload",
    Daload = 0x31 => "daload",
    Aaload = 0x32 => "aaload",
    Baload = 0x33 => "baload",
    Caload = 0x34 => "caload",
    Saload = 0x35 => "saload",
    Istore = 0x36 => "istore",
    Lstore = 0x37 => "lstore",
    Fstore = 0x38 => "fstore",
    Dstore = 0x39 => "dstore",
    Astore = 0x3a => "astore",
    Istore0 = 0x3b => "istore_0",
    Istore1 = 0x3c => "istore_1",
    Istore2 = 0x3d => "istore_2",
    Istore3 = 0x3e => "istore_3",
    Lstore0 = 0x3f => "lstore_0",
    Lstore1 = 0x40 => "lstore_1",
    Lstore2 = 0x41 => "lstore_2",
    Lstore3 = 0x42 => "lstore_3",
    Fstore0 = 0x43 => "fstore_0",
    Fstore1 = 0x44 => "fstore_1",
    Fstore2 = 0x45 => "fstore_2",
    Fstore3 = 0x46 => "fstore_3",
    Dstore0 = 0x47 => "dstore_0",
    Dstore1 = 0x48 => "dstore_1",
    Dstore2 = 0x49 => "dstore_2",
    Dstore3 = 0x4a => "dstore_3",
    Astore0 = 0x4b => "astore_0",
    Astore1 = 0x4c => "astore_1",
    Astore2 = 0x4d => "astore_2",
    Astore3 = 0x4e => "astore_3",
    Iastore = 0x4f => "iastore",
    Lastore = 0x50 => "lastore",
    Fastore = 0x51 => "fastore",
    Dastore = 0x52 => "dastore",
    Aastore = 0x53 => "aastore",
    Bastore = 0x54 => "bastore",
    Castore = 0x55 => "castore",
    Sastore = 0x56 => "sastore",
    Pop = 0x57 => "pop",
    Pop2 = 0x58 => "pop2",
    Dup = 0x59 => "dup",
    DupX1 = 0x5a => "dup_x1",
    DupX2 = 0x5b => "dup_x2",
    Dup2 = 0x5c => "dup2",
    Dup2X1 = 0x5d => "dup2_x1",
    Dup2X2 = 0x5e => "dup2_x2",
    Swap = 0x5f => "swap",
    Iadd = 0x60 => "iadd",
    Ladd = 0x61 => "ladd",
    Fadd = 0x62 => "fadd",
    Dadd = 0x63 => "dadd",
    Isub = 0x64 => "isub",
    Lsub = 0x65 => "lsub",
    Fsub = 0x66 => "fsub",
    Dsub = 0x67 => "dsub",
    Imul = 0x68 => "imul",
    Lmul = 0x69 => "lmul",
    Fmul = 0x6a => "fmul",
    Dmul = 0x6b => "dmul",
    Idiv = 0x6c => "idiv",
    Ldiv = 0x6d => "ldiv",
    Fdiv = 0x6e => "fdiv",
    Ddiv = 0x6f => "ddiv",
    Irem = 0x70 => "irem",
    Lrem = 0x71 => "lrem",
    Frem = 0x72 => "frem",
    Drem = 0x73 => "drem",
    Ineg = 0x74 => "ineg",
    Lneg = 0x75 => "lneg",
    Fneg = 0x76 => "fneg",
    Dneg = 0x77 => "dneg",
    Ishl = 0x78 => "ishl",
    Lshl = 0x79 => "lshl",
    Ishr = 0x7a => "ishr",
    Lshr = 0x7b => "lshr",
    Iushr = 0x7c => "iushr",
    Lushr = 0x7d => "lushr",
    Iand = 0x7e => "iand",
    Land = 0x7f => "land",
    Ior = 0x80 => "ior",
    Lor = 0x81 => "lor",
    Ixor = 0x82 => "ixor",
    Lxor = 0x83 => "lxor",
    Iinc = 0x84 => "iinc",
    I2l = 0x85 => "i2l",
    I2f = 0x86 => "i2f",
    I2d = 0x87 => "i2d",
    L2i = 0x88 => "l2i",
    L2f = 0x89 => "l2f",
    L2d = 0x8a => "l2d",
    F2i = 0x8b => "f2i",
    F2l = 0x8c => "f2l",
    F2d = 0x8d => "f2d",
    D2i = 0x8e => "d2i",
    D2l = 0x8f => "d2l",
    D2f = 0x90 => "d2f",
    I2b = 0x91 => "i2b",
    I2c = 0x92 => "i2c",
    I2s = 0x93 => "i2s",
    Lcmp = 0x94 => "lcmp",
    Fcmpl = 0x95 => "fcmpl",
    Fcmpg = 0x96 => "fcmpg",
    Dcmpl = 0x97 => "dcmpl",
    Dcmpg = 0x98 => "dcmpg",
    Ifeq = 0x99 => "ifeq",
    Ifne = 0x9a => "ifne",
    Iflt = 0x9b => "iflt",
    Ifge = 0x9c => "ifge",
    Ifgt = 0x9d => "ifgt",
    Ifle = 0x9e => "ifle",
    IfIcmpeq = 0x9f => "if_icmpeq",
    IfIcmpne = 0xa0 => "if_icmpne",
    IfIcmplt = 0xa1 => "if_icmplt",
    IfIcmpge = 0xa2 => "if_icmpge",
    IfIcmpgt = 0xa3 => "if_icmpgt",
    IfIcmple = 0xa4 => "if_icmple",
    IfAcmpeq = 0xa5 => "if_acmpeq",
    IfAcmpne = 0xa6 => "if_acmpne",
    Goto = 0xa7 => "goto",
    Jsr = 0xa8 => "jsr",
    Ret = 0xa9 => "ret",
    Tableswitch = 0xaa => "tableswitch",
    Lookupswitch = 0xab => "lookupswitch",
    Ireturn = 0xac => "ireturn",
    Lreturn = 0xad => "lreturn",
    Freturn = 0xae => "freturn",
    Dreturn = 0xaf => "dreturn",
    Areturn = 0xb0 => "areturn",
    Return = 0xb1 => "return",
    Getstatic = 0xb2 => "getstatic",
    Putstatic = 0xb3 => "putstatic",
    Getfield = 0xb4 => "getfield",
    Putfield = 0xb5 => "putfield",
    Invokevirtual = 0xb6 => "invokevirtual",
    Invokespecial = 0xb7 => "invokespecial",
    Invokestatic = 0xb8 => "invokestatic",
    Invokeinterface = 0xb9 => "invokeinterface",
    Invokedynamic = 0xba => "invokedynamic",
    New = 0xbb => "new",
    Newarray = 0xbc => "newarray",
    Anewarray = 0xbd => "anewarray",
    Arraylength = 0xbe => "arraylength",
    Athrow = 0xbf => "athrow",
    Checkcast = 0xc0 => "checkcast",
    Instanceof = 0xc1 => "instanceof",
    Monitorenter = 0xc2 => "monitorenter",
    Monitorexit = 0xc3 => "monitorexit",
    Wide = 0xc4 => "wide",
    Multianewarray = 0xc5 => "multianewarray",
    Ifnull = 0xc6 => "ifnull",
    Ifnonnull = 0xc7 => "ifnonnull",
    GotoW = 0xc8 => "goto_w",
    JsrW = 0xc9 => "jsr_w",
}

/// The operand shape an instruction takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionCategory {
    /// No operand, or an inline immediate
    Simple,
    /// Addresses a local-variable slot
    Variable,
    /// Carries one relative branch offset
    Branch,
    /// Indexes the constant pool
    Constant,
    /// Table or lookup switch
    Switch,
}

impl Opcode {
    /// Returns the operand shape of this opcode.
    #[must_use]
    pub fn category(self) -> InstructionCategory {
        use Opcode::*;
        match self {
            Iload | Lload | Fload | Dload | Aload | Iload0 | Iload1 | Iload2 | Iload3 | Lload0
            | Lload1 | Lload2 | Lload3 | Fload0 | Fload1 | Fload2 | Fload3 | Dload0 | Dload1
            | Dload2 | Dload3 | Aload0 | Aload1 | Aload2 | Aload3 | Istore | Lstore | Fstore
            | Dstore | Astore | Istore0 | Istore1 | Istore2 | Istore3 | Lstore0 | Lstore1
            | Lstore2 | Lstore3 | Fstore0 | Fstore1 | Fstore2 | Fstore3 | Dstore0 | Dstore1
            | Dstore2 | Dstore3 | Astore0 | Astore1 | Astore2 | Astore3 | Iinc | Ret => {
                InstructionCategory::Variable
            }
            Ldc | LdcW | Ldc2W | Getstatic | Putstatic | Getfield | Putfield | Invokevirtual
            | Invokespecial | Invokestatic | Invokeinterface | Invokedynamic | New | Anewarray
            | Checkcast | Instanceof | Multianewarray => InstructionCategory::Constant,
            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle | IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge
            | IfIcmpgt | IfIcmple | IfAcmpeq | IfAcmpne | Goto | Jsr | Ifnull | Ifnonnull
            | GotoW | JsrW => InstructionCategory::Branch,
            Tableswitch | Lookupswitch => InstructionCategory::Switch,
            _ => InstructionCategory::Simple,
        }
    }

    /// Returns the slot implied by the `_0` .. `_3` shorthand forms.
    #[must_use]
    pub fn implicit_local(self) -> Option<u16> {
        use Opcode::*;
        match self {
            Iload0 | Lload0 | Fload0 | Dload0 | Aload0 | Istore0 | Lstore0 | Fstore0 | Dstore0
            | Astore0 => Some(0),
            Iload1 | Lload1 | Fload1 | Dload1 | Aload1 | Istore1 | Lstore1 | Fstore1 | Dstore1
            | Astore1 => Some(1),
            Iload2 | Lload2 | Fload2 | Dload2 | Aload2 | Istore2 | Lstore2 | Fstore2 | Dstore2
            | Astore2 => Some(2),
            Iload3 | Lload3 | Fload3 | Dload3 | Aload3 | Istore3 | Lstore3 | Fstore3 | Dstore3
            | Astore3 => Some(3),
            _ => None,
        }
    }

    /// Returns true for the instructions that load a local variable onto the stack.
    #[must_use]
    pub fn is_load(self) -> bool {
        (Opcode::Iload as u8..=Opcode::Aload3 as u8).contains(&(self as u8))
    }

    /// Returns true for the instructions that store the stack top into a local variable.
    #[must_use]
    pub fn is_store(self) -> bool {
        (Opcode::Istore as u8..=Opcode::Astore3 as u8).contains(&(self as u8))
    }

    /// Returns true if the local variable addressed by this opcode holds a `long` or `double`.
    #[must_use]
    pub fn is_wide_local(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Lload | Dload | Lload0 | Lload1 | Lload2 | Lload3 | Dload0 | Dload1 | Dload2
                | Dload3 | Lstore | Dstore | Lstore0 | Lstore1 | Lstore2 | Lstore3 | Dstore0
                | Dstore1 | Dstore2 | Dstore3
        )
    }

    /// Returns true for the method invocation instructions.
    #[must_use]
    pub fn is_invocation(self) -> bool {
        matches!(
            self,
            Opcode::Invokevirtual
                | Opcode::Invokespecial
                | Opcode::Invokestatic
                | Opcode::Invokeinterface
                | Opcode::Invokedynamic
        )
    }

    /// Returns true for the field access instructions.
    #[must_use]
    pub fn is_field_access(self) -> bool {
        matches!(
            self,
            Opcode::Getstatic | Opcode::Putstatic | Opcode::Getfield | Opcode::Putfield
        )
    }

    /// Returns true for `putfield` and `putstatic`.
    #[must_use]
    pub fn is_field_write(self) -> bool {
        matches!(self, Opcode::Putstatic | Opcode::Putfield)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// No operand, including the shorthand local-variable forms
    None,
    /// Inline immediate of `bipush`, `sipush` and the array type of `newarray`
    Immediate(i32),
    /// Local-variable slot of loads, stores and `ret`
    Local(u16),
    /// Slot and signed delta of `iinc`
    Increment {
        /// The local-variable slot
        index: u16,
        /// The increment
        delta: i16,
    },
    /// Branch offset relative to the instruction's own offset
    Branch(i32),
    /// Constant-pool index
    Constant(u16),
    /// Constant-pool index and dimension count of `multianewarray`
    MultiArray {
        /// Index of the array class constant
        index: u16,
        /// Number of dimensions to create
        dimensions: u8,
    },
    /// Switch cases as `(match, relative offset)` pairs plus the default offset
    Switch {
        /// Default branch offset
        default: i32,
        /// Case values with their branch offsets
        cases: Vec<(i32, i32)>,
    },
}

/// One decoded instruction of a method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// Byte offset of the instruction within the code
    pub offset: u32,
    /// The opcode
    pub opcode: Opcode,
    /// The decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// Creates an instruction at offset 0.
    #[must_use]
    pub fn new(opcode: Opcode, operand: Operand) -> Self {
        Self {
            offset: 0,
            opcode,
            operand,
        }
    }

    /// Creates an operand-less instruction at offset 0.
    #[must_use]
    pub fn simple(opcode: Opcode) -> Self {
        Self::new(opcode, Operand::None)
    }

    /// Returns the operand shape of this instruction.
    #[must_use]
    pub fn category(&self) -> InstructionCategory {
        self.opcode.category()
    }

    /// Returns the constant-pool index this instruction refers to, if any.
    #[must_use]
    pub fn constant_index(&self) -> Option<u16> {
        match self.operand {
            Operand::Constant(index) | Operand::MultiArray { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Returns the local-variable slot this instruction addresses, if any.
    #[must_use]
    pub fn local_index(&self) -> Option<u16> {
        match self.operand {
            Operand::Local(index) | Operand::Increment { index, .. } => Some(index),
            _ => self.opcode.implicit_local(),
        }
    }

    /// Returns every relative branch offset of a branch or switch instruction.
    #[must_use]
    pub fn branch_offsets(&self) -> Vec<i32> {
        match &self.operand {
            Operand::Branch(offset) => vec![*offset],
            Operand::Switch { default, cases } => std::iter::once(*default)
                .chain(cases.iter().map(|(_, offset)| *offset))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the encoded length in bytes of this instruction at its offset.
    #[must_use]
    pub fn length(&self) -> u32 {
        use Opcode::*;
        match (self.opcode, &self.operand) {
            (Bipush | Newarray, _) => 2,
            (Sipush, _) => 3,
            (Ldc, Operand::Constant(index)) if *index > 0xff => 3,
            (Ldc, _) => 2,
            (LdcW | Ldc2W, _) => 3,
            (Iinc, Operand::Increment { index, delta }) => {
                if *index > 0xff || i8::try_from(*delta).is_err() {
                    6
                } else {
                    3
                }
            }
            (_, Operand::Local(index)) => {
                if *index > 0xff {
                    4
                } else {
                    2
                }
            }
            (Invokeinterface | Invokedynamic, _) => 5,
            (Multianewarray, _) => 4,
            (GotoW | JsrW, _) => 5,
            (Tableswitch, Operand::Switch { cases, .. }) => {
                1 + self.switch_padding() + 12 + 4 * cases.len() as u32
            }
            (Lookupswitch, Operand::Switch { cases, .. }) => {
                1 + self.switch_padding() + 8 + 8 * cases.len() as u32
            }
            _ => match self.category() {
                InstructionCategory::Constant | InstructionCategory::Branch => 3,
                _ => 1,
            },
        }
    }

    fn switch_padding(&self) -> u32 {
        (4 - (self.offset + 1) % 4) % 4
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.offset, self.opcode)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(value) => write!(f, " {value}"),
            Operand::Local(index) => write!(f, " v{index}"),
            Operand::Increment { index, delta } => write!(f, " v{index}, {delta}"),
            Operand::Branch(offset) => write!(f, " {:+}", offset),
            Operand::Constant(index) => write!(f, " #{index}"),
            Operand::MultiArray { index, dimensions } => write!(f, " #{index}, {dimensions}"),
            Operand::Switch { default, cases } => {
                write!(f, " default: {:+}, {} cases", default, cases.len())
            }
        }
    }
}

/// One entry of the exception table of a method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionHandler {
    /// First covered offset
    pub start: u32,
    /// First offset past the covered range
    pub end: u32,
    /// Offset of the handler code
    pub handler: u32,
    /// Class constant of the caught type, `0` for catch-all handlers
    pub catch_type: u16,
}

/// The body of a method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Code {
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local-variable slots, parameters included
    pub max_locals: u16,
    /// The decoded instructions, in offset order
    pub instructions: Vec<Instruction>,
    /// Exception handlers, in priority order
    pub exception_table: Vec<ExceptionHandler>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_opcode_table_is_complete() {
        assert_eq!(Opcode::COUNT, 0xca);
        for (expected, opcode) in Opcode::iter().enumerate() {
            assert_eq!(opcode as usize, expected);
            assert_eq!(Opcode::from_repr(expected as u8), Some(opcode));
        }
        assert_eq!(Opcode::from_repr(0xca), None);
        assert_eq!(Opcode::from_repr(0xff), None);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::IconstM1.mnemonic(), "iconst_m1");
        assert_eq!(Opcode::IfIcmpge.to_string(), "if_icmpge");
        assert_eq!(Opcode::Ldc2W.to_string(), "ldc2_w");
        assert_eq!(Opcode::Aload0.to_string(), "aload_0");
    }

    #[test]
    fn test_categories() {
        assert_eq!(Opcode::Iadd.category(), InstructionCategory::Simple);
        assert_eq!(Opcode::Bipush.category(), InstructionCategory::Simple);
        assert_eq!(Opcode::Lload2.category(), InstructionCategory::Variable);
        assert_eq!(Opcode::Ret.category(), InstructionCategory::Variable);
        assert_eq!(Opcode::Ifnull.category(), InstructionCategory::Branch);
        assert_eq!(Opcode::JsrW.category(), InstructionCategory::Branch);
        assert_eq!(Opcode::Invokedynamic.category(), InstructionCategory::Constant);
        assert_eq!(Opcode::Lookupswitch.category(), InstructionCategory::Switch);
    }

    #[test]
    fn test_local_variable_helpers() {
        assert!(Opcode::Aload3.is_load());
        assert!(!Opcode::Iaload.is_load());
        assert!(Opcode::Dstore.is_store());
        assert!(!Opcode::Iastore.is_store());
        assert!(Opcode::Lload1.is_wide_local());
        assert!(!Opcode::Iload1.is_wide_local());

        assert_eq!(Instruction::simple(Opcode::Dload2).local_index(), Some(2));
        assert_eq!(
            Instruction::new(Opcode::Iinc, Operand::Increment { index: 7, delta: 1 })
                .local_index(),
            Some(7)
        );
        assert_eq!(Instruction::simple(Opcode::Iadd).local_index(), None);
    }

    #[test]
    fn test_lengths() {
        assert_eq!(Instruction::simple(Opcode::Nop).length(), 1);
        assert_eq!(Instruction::new(Opcode::Iload, Operand::Local(4)).length(), 2);
        assert_eq!(Instruction::new(Opcode::Iload, Operand::Local(300)).length(), 4);
        assert_eq!(Instruction::new(Opcode::Ldc, Operand::Constant(3)).length(), 2);
        assert_eq!(Instruction::new(Opcode::Ldc, Operand::Constant(300)).length(), 3);
        assert_eq!(
            Instruction::new(Opcode::Invokeinterface, Operand::Constant(3)).length(),
            5
        );
        assert_eq!(Instruction::new(Opcode::Goto, Operand::Branch(-3)).length(), 3);
        assert_eq!(
            Instruction::new(Opcode::Iinc, Operand::Increment { index: 1, delta: 200 }).length(),
            6
        );

        let mut switch = Instruction::new(
            Opcode::Tableswitch,
            Operand::Switch {
                default: 20,
                cases: vec![(0, 10), (1, 15)],
            },
        );
        switch.offset = 1;
        // 1 opcode + 2 padding + 12 header + 2 * 4 offsets
        assert_eq!(switch.length(), 23);
    }

    #[test]
    fn test_branch_offsets() {
        let switch = Instruction::new(
            Opcode::Lookupswitch,
            Operand::Switch {
                default: 8,
                cases: vec![(5, -4), (9, 12)],
            },
        );
        assert_eq!(switch.branch_offsets(), vec![8, -4, 12]);
        assert_eq!(
            Instruction::new(Opcode::Goto, Operand::Branch(-7)).branch_offsets(),
            vec![-7]
        );
        assert!(Instruction::simple(Opcode::Return).branch_offsets().is_empty());
    }

    #[test]
    fn test_display() {
        let mut instruction = Instruction::new(Opcode::Getfield, Operand::Constant(12));
        instruction.offset = 4;
        assert_eq!(instruction.to_string(), "[4] getfield #12");
        assert_eq!(
            Instruction::new(Opcode::Goto, Operand::Branch(-4)).to_string(),
            "[0] goto -4"
        );
    }
}
