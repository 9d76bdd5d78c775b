pub mod h264_reader;
