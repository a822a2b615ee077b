macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident , )+ ) => {
        /// Defines the instruction set, one tag per mnemonic. Mnemonics are
        /// resolved to tags once at load time; execution dispatches on the
        /// tag alone.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }

            /// Resolves a mnemonic, ignoring case. Returns `None` for unknown
            /// mnemonics; the processor reports those when they are reached.
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|instruction| mnemonic.eq_ignore_ascii_case(instruction.name()))
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// No operation
    NOP,
    /// Load a memory cell into the accumulator
    /// @syntax LDA 0x50
    LDA,
    /// Store the accumulator into a memory cell
    /// @syntax STA 0x50
    STA,
    /// Load a memory cell into a register
    /// @syntax LDR R1, 0x50
    LDR,
    /// Store a register into a memory cell
    /// @syntax STR R1, 0x50
    STR,
    /// Load an immediate value into a register
    /// @syntax LDRI R1, 10
    LDRI,
    /// Load an immediate value into the accumulator
    /// @syntax LDI 10
    LDI,
    /// Move a value between registers or the accumulator (source, destination)
    /// @syntax MOV R1, A
    MOV,
    /// Add a register or memory cell to the accumulator
    /// @syntax ADD R1
    ADD,
    /// Subtract a memory cell from the accumulator
    /// @syntax SUB 0x50
    SUB,
    /// Bitwise AND of the accumulator with a memory cell
    /// @syntax AND 0x50
    AND,
    /// Bitwise OR of the accumulator with a memory cell
    /// @syntax OR 0x50
    OR,
    /// Bitwise XOR of the accumulator with a memory cell
    /// @syntax XOR 0x50
    XOR,
    /// Jump to a label
    /// @syntax JMP LOOP
    JMP,
    /// Jump to a label if the accumulator is greater than zero
    /// @syntax JG LOOP
    JG,
    /// Jump to a label if the Zero flag is set
    /// @syntax JZ DONE
    JZ,
    /// Jump to a label if the Zero flag is clear
    /// @syntax JNZ LOOP
    JNZ,
    /// Jump to a label if the Carry flag is set
    /// @syntax JC OVERFLOW
    JC,
    /// Jump to a label if the Carry flag is clear
    /// @syntax JNC CONTINUE
    JNC,
    /// Complement the accumulator (bitwise NOT)
    CMA,
    /// Increment the accumulator by one
    INC,
    /// Decrement the accumulator by one
    DEC,
    /// Rotate the accumulator left, circular
    RAL,
    /// Rotate the accumulator right, circular
    RAR,
    /// Read the simulated input into the accumulator
    INP,
    /// Emit the accumulator, or a register when one is named
    /// @syntax OUT R1
    OUT,
    /// Halt the program
    HLT,
    /// Push the accumulator onto the stack
    PUSH,
    /// Pop the top of the stack into the accumulator
    POP,
    /// Emit a message with register, accumulator and memory placeholders
    /// @syntax NOTE counter is {R1}, acc {A}
    NOTE,
}
