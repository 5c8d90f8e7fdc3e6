fn main() {
    #[cfg(feature = "cuda")]
    {
        use cuda_builder::CudaBuilder;

        println!("cargo:rerun-if-changed=../kernel_tools/src");
        CudaBuilder::new("../kernel_tools")
            .copy_to("../resources/kernel_tools.ptx")
            .build()
            .unwrap();
    }
}
