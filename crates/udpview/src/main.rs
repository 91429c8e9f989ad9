use udpview::{
    gui::WindowDisplay,
    video::udp::UdpStream,
    viewer::{self, ViewerOptions, STREAM_URI},
};

#[udpview::main]
fn main() {
    let stream = UdpStream::open(STREAM_URI);
    viewer::run(stream, &mut WindowDisplay, &ViewerOptions::default());
}
